//! Generate subcommand implementation.

use crate::config::AppSettings;
use crate::encoder::{encode_async, EncodeRequest, ErrorCorrection};
use crate::error::{CliError, CliResult};
use crate::output;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Render a QR code to a PNG file.
#[derive(Parser, Debug)]
pub struct GenerateCommand {
    /// Text to encode
    #[arg(value_name = "DATA")]
    pub data: String,

    /// Image side length in pixels
    #[arg(short, long)]
    pub size: Option<u32>,

    /// Dark module color (#RRGGBB, #AARRGGBB or a color name)
    #[arg(long = "fg", value_name = "COLOR")]
    pub foreground: Option<String>,

    /// Light module color (#RRGGBB, #AARRGGBB or a color name)
    #[arg(long = "bg", value_name = "COLOR")]
    pub background: Option<String>,

    /// Error-correction level
    #[arg(short = 'e', long, value_enum, ignore_case = true)]
    pub error_correction: Option<ErrorCorrection>,

    /// Image to place in the center of the code
    #[arg(long, value_name = "PATH")]
    pub logo: Option<PathBuf>,

    /// Output file
    #[arg(short, long, default_value = "qr.png")]
    pub output: PathBuf,
}

impl GenerateCommand {
    /// Settings defaults with command-line overrides applied.
    pub fn request(&self, settings: &AppSettings) -> CliResult<EncodeRequest> {
        let mut request = settings.encode_request(self.data.as_str());
        if let Some(size) = self.size {
            request = request.with_size(size);
        }
        if let Some(fg) = &self.foreground {
            request = request.with_foreground(fg.as_str());
        }
        if let Some(bg) = &self.background {
            request = request.with_background(bg.as_str());
        }
        if let Some(level) = self.error_correction {
            request = request.with_error_correction(level);
        }
        if let Some(path) = &self.logo {
            let logo = fs::read(path)
                .map_err(|e| CliError::Other(format!("failed to read logo {}: {}", path.display(), e)))?;
            request = request.with_logo(logo);
        }
        Ok(request)
    }

    /// Execute the generate command.
    pub async fn execute(&self, settings: &AppSettings, quiet: bool) -> CliResult<()> {
        let request = self.request(settings)?;
        let level = request.error_correction;
        let image = encode_async(request).await?;

        fs::write(&self.output, image.bytes())?;
        info!(
            path = %self.output.display(),
            bytes = image.bytes().len(),
            size_px = image.size_px(),
            "Wrote QR image"
        );

        if !quiet {
            output::print_generated(&self.output, image.size_px(), level);
        }
        Ok(())
    }
}
