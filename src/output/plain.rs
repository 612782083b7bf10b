//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::encoder::ErrorCorrection;
use crate::scanner::{DetectionResult, ScanMode};
use console::style;
use std::io::{self, Write};
use std::path::Path;

/// Write one result in human-readable form.
pub fn write_plain<W: Write>(out: &mut W, result: &DetectionResult) -> io::Result<()> {
    writeln!(
        out,
        "{} {}  {}",
        style("✓").green().bold(),
        style(result.format).cyan(),
        style(&result.text).white().bold()
    )?;

    let mut details = vec![
        format!("session {}", result.session.short()),
        result.detected_at.format("%H:%M:%S%.3f").to_string(),
    ];
    if let Some(template) = result.template {
        details.push(format!("template {}", template));
    }
    if let Some(bytes) = &result.raw_bytes {
        details.push(format!("{} bytes", bytes.len()));
    }
    writeln!(out, "  {}", style(details.join(" · ")).dim())
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(mode: ScanMode, continuous: bool, sources: usize) {
    eprintln!();
    eprintln!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("qrscan").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{} Mode: {}", style("•").dim(), style(mode).yellow());
    eprintln!(
        "{} Session: {}",
        style("•").dim(),
        if continuous { "continuous" } else { "single-shot" }
    );
    eprintln!(
        "{} Replaying {} image(s)...",
        style("•").dim(),
        style(sources).white().bold()
    );
    eprintln!();
}

/// Report a written QR image.
pub fn print_generated(path: &Path, size_px: u32, level: ErrorCorrection) {
    print_success(&format!(
        "Wrote {} ({}x{} px, error correction {})",
        style(path.display()).white().bold(),
        size_px,
        size_px,
        level
    ));
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    eprintln!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    eprintln!("{} {}", style("ℹ").blue().bold(), msg);
}
