//! CLI subcommand definitions and handlers.
//!
//! - `qrscan generate <data>` - Render a QR code to PNG
//! - `qrscan scan <image>...` - Replay images through a scan session

mod generate;
mod scan;

pub use generate::GenerateCommand;
pub use scan::ScanCommand;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// qrscan - QR generation and frame-driven code scanning.
#[derive(Parser, Debug)]
#[command(name = "qrscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate QR codes and scan codes from image frames", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a QR code to a PNG file
    #[command(alias = "g")]
    Generate(GenerateCommand),

    /// Scan codes from a sequence of images
    #[command(alias = "s")]
    Scan(ScanCommand),
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// One JSON object per line
    Json,
    /// CSV with a header row
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}
