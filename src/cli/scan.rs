//! Scan subcommand implementation.
//!
//! Replays image files through a scan session with the bundled QR decoder.

use crate::cli::OutputFormat;
use crate::config::AppSettings;
use crate::error::{CliError, CliResult, ScanError};
use crate::output::{self, ResultWriter};
use crate::scanner::{
    AlwaysGranted, CameraFacing, Collaborators, DetectionFeedback, ImageSequenceCamera, NoFeedback,
    RqrrDecoder, ScanMode, ScanOptions, ScanSession, SessionMode, Template, TerminalBell,
};
use clap::Parser;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Scan codes from a sequence of images.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Image files replayed as camera frames, in order
    #[arg(value_name = "IMAGE", required = true)]
    pub images: Vec<PathBuf>,

    /// Symbologies to report
    #[arg(short, long, value_enum, default_value = "qr")]
    pub mode: ScanMode,

    /// Keep scanning and report every new code
    #[arg(long)]
    pub continuous: bool,

    /// Milliseconds between replayed frames
    #[arg(long, default_value = "100")]
    pub interval_ms: u64,

    /// Replay the images in a loop
    #[arg(long = "loop")]
    pub looping: bool,

    /// Give up after this many milliseconds (idle time when continuous)
    #[arg(long, default_value = "10000")]
    pub timeout_ms: u64,

    /// Camera to open
    #[arg(short, long, value_enum)]
    pub camera: Option<CameraFacing>,

    /// Overlay template for QR scans
    #[arg(short, long, value_enum)]
    pub template: Option<Template>,

    /// Output format for results
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

impl ScanCommand {
    /// Settings defaults with command-line overrides applied.
    pub fn options(&self, settings: &AppSettings) -> ScanOptions {
        let mut options = settings.scan_options(self.mode);
        if let Some(camera) = self.camera {
            options = options.with_camera(camera);
        }
        if let Some(template) = self.template {
            options = options.with_template(template);
        }
        options
    }

    fn session(&self, settings: &AppSettings, quiet: bool) -> CliResult<ScanSession> {
        let camera = ImageSequenceCamera::open(self.images.as_slice())
            .map_err(|e| CliError::Other(format!("failed to load image: {}", e)))?
            .with_interval(Duration::from_millis(self.interval_ms))
            .looping(self.looping);

        let feedback: Arc<dyn DetectionFeedback> = if quiet {
            Arc::new(NoFeedback)
        } else {
            Arc::new(TerminalBell::stderr())
        };
        let collaborators = Collaborators::new(
            Arc::new(camera),
            Arc::new(RqrrDecoder::new()),
            Arc::new(AlwaysGranted),
            feedback,
        );
        let mode = if self.continuous {
            SessionMode::Continuous
        } else {
            SessionMode::SingleShot
        };

        Ok(ScanSession::new(
            self.options(settings),
            mode,
            collaborators,
            settings.session_config(),
        ))
    }

    /// Execute the scan command.
    pub async fn execute(&self, settings: &AppSettings, quiet: bool) -> CliResult<()> {
        let format = self.output.unwrap_or(settings.default_output_format);
        let session = self.session(settings, quiet)?;
        if !quiet {
            output::print_scan_header(self.mode, self.continuous, self.images.len());
        }

        let mut writer = ResultWriter::stdout(format);
        if self.continuous {
            self.run_continuous(session, &mut writer).await?;
            if !quiet {
                output::print_info(&format!("{} code(s) detected", writer.written()));
            }
        } else {
            self.run_single_shot(session, &mut writer).await?;
        }
        Ok(())
    }

    async fn run_single_shot<W: Write>(&self, session: ScanSession, writer: &mut ResultWriter<W>) -> CliResult<()> {
        let handle = session.handle();
        let timeout = Duration::from_millis(self.timeout_ms);
        let scan = session.scan_once();
        tokio::pin!(scan);

        let mut timed_out = false;
        let outcome = tokio::select! {
            outcome = &mut scan => outcome,
            _ = tokio::time::sleep(timeout) => {
                debug!(timeout_ms = self.timeout_ms, "Scan timed out, cancelling");
                timed_out = true;
                handle.cancel();
                scan.await
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, cancelling scan");
                handle.cancel();
                scan.await
            }
        };
        debug!(stats = ?handle.stats(), "Scan finished");

        match outcome {
            Ok(result) => {
                writer.write(&result)?;
                Ok(())
            }
            Err(ScanError::CancelledByUser) if timed_out => Err(CliError::Other(format!(
                "no code detected within {} ms",
                self.timeout_ms
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn run_continuous<W: Write>(&self, session: ScanSession, writer: &mut ResultWriter<W>) -> CliResult<()> {
        let idle = Duration::from_millis(self.timeout_ms);
        let mut stream = session.start_stream().await?;

        loop {
            tokio::select! {
                next = tokio::time::timeout(idle, stream.next()) => match next {
                    Ok(Some(result)) => writer.write(&result)?,
                    Ok(None) => break,
                    Err(_) => {
                        debug!(idle_ms = self.timeout_ms, "No new codes, closing scan");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, closing scan");
                    break;
                }
            }
        }

        stream.close();
        debug!(stats = ?stream.handle().stats(), "Scan finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_code(dir: &std::path::Path, name: &str, data: &str) -> PathBuf {
        let png = crate::encoder::encode(&crate::encoder::EncodeRequest::new(data)).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, png.bytes()).unwrap();
        path
    }

    fn command(images: Vec<PathBuf>, continuous: bool) -> ScanCommand {
        ScanCommand {
            images,
            mode: ScanMode::Qr,
            continuous,
            interval_ms: 10,
            looping: false,
            timeout_ms: 2000,
            camera: None,
            template: None,
            output: Some(OutputFormat::Json),
        }
    }

    #[tokio::test]
    async fn test_single_shot_writes_result() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = command(vec![write_code(dir.path(), "a.png", "ticket-42")], false);
        let session = cmd.session(&AppSettings::default(), true).unwrap();

        let mut writer = ResultWriter::new(OutputFormat::Json, Vec::new());
        cmd.run_single_shot(session, &mut writer).await.unwrap();

        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let json: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(json["text"], "ticket-42");
    }

    #[tokio::test]
    async fn test_single_shot_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let blank = dir.path().join("blank.png");
        image::GrayImage::from_pixel(64, 64, image::Luma([255])).save(&blank).unwrap();

        let mut cmd = command(vec![blank], false);
        cmd.timeout_ms = 200;
        let session = cmd.session(&AppSettings::default(), true).unwrap();

        let mut writer = ResultWriter::new(OutputFormat::Json, Vec::new());
        let err = cmd.run_single_shot(session, &mut writer).await.unwrap_err();
        assert!(matches!(err, CliError::Other(msg) if msg.contains("200 ms")));
        assert_eq!(writer.written(), 0);
    }

    #[tokio::test]
    async fn test_continuous_collects_distinct_codes() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![
            write_code(dir.path(), "a.png", "A"),
            write_code(dir.path(), "b.png", "B"),
        ];
        let mut cmd = command(images, true);
        cmd.interval_ms = 50;
        cmd.timeout_ms = 1500;
        let session = cmd.session(&AppSettings::default(), true).unwrap();

        let mut writer = ResultWriter::new(OutputFormat::Json, Vec::new());
        cmd.run_continuous(session, &mut writer).await.unwrap();
        assert_eq!(writer.written(), 2);
    }

    #[test]
    fn test_missing_image_is_error() {
        let cmd = command(vec![PathBuf::from("/nonexistent/frame.png")], false);
        assert!(matches!(cmd.session(&AppSettings::default(), true), Err(CliError::Other(_))));
    }

    #[test]
    fn test_cli_overrides_settings() {
        let mut cmd = command(vec![], false);
        cmd.camera = Some(CameraFacing::Front);
        let options = cmd.options(&AppSettings::default());
        assert_eq!(options.camera_facing, CameraFacing::Front);
        assert_eq!(options.template, Template::Simple);
    }
}
