//! qrscan - QR generation and frame-driven code scanning.

use anyhow::{Context, Result};
use clap::Parser;
use qrscan::cli::{Cli, Commands};
use qrscan::config::AppSettings;
use qrscan::output;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = match &cli.config {
        Some(path) => AppSettings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => AppSettings::load().context("failed to load settings")?,
    };
    debug!(?settings, "Effective settings");

    let result = match &cli.command {
        Commands::Generate(cmd) => cmd.execute(&settings, cli.quiet).await,
        Commands::Scan(cmd) => cmd.execute(&settings, cli.quiet).await,
    };

    if let Err(e) = result {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }

    Ok(())
}
