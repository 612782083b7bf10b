//! # qrscan - QR generation and frame-driven code scanning
//!
//! Two independent halves:
//!
//! - **Encoder**: turns text into a QR code PNG at an exact pixel size, with
//!   custom colors, an error-correction level and an optional center logo.
//! - **Scan engine**: runs camera frames through a decoder inside a session
//!   that either stops at the first code (single-shot) or streams
//!   de-duplicated codes until closed (continuous). Frames are processed
//!   keep-only-latest, so a slow decoder never builds a backlog.
//!
//! Cameras, decoders, permission prompts and detection feedback are traits,
//! so the engine runs the same against real hardware or in-memory fakes.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use qrscan::encoder::{encode, EncodeRequest, ErrorCorrection};
//! use qrscan::scanner::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let png = encode(
//!         &EncodeRequest::new("https://example.com")
//!             .with_size(400)
//!             .with_error_correction(ErrorCorrection::H),
//!     )?;
//!     std::fs::write("code.png", png.bytes())?;
//!
//!     let camera = ImageSequenceCamera::open(&["code.png"])?;
//!     let collaborators = Collaborators::new(
//!         Arc::new(camera),
//!         Arc::new(RqrrDecoder::new()),
//!         Arc::new(AlwaysGranted),
//!         Arc::new(NoFeedback),
//!     );
//!     let session = ScanSession::new(
//!         ScanOptions::new(ScanMode::Qr),
//!         SessionMode::SingleShot,
//!         collaborators,
//!         SessionConfig::default(),
//!     );
//!     let result = session.scan_once().await?;
//!     println!("{}", result.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Colors, symbology names and session identifiers
//! - [`encoder`] - QR matrix construction, rasterization and PNG output
//! - [`scanner`] - Sessions, the frame pipeline, debouncing and collaborators
//! - [`config`] - Persistent settings
//! - [`output`] - Plain, JSON and CSV result formatting
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use encoder::{encode, encode_async, EncodeRequest, EncodedImage, ErrorCorrection};
pub use error::{CliError, DecodeError, EncodeError, ScanError};
pub use scanner::{DetectionResult, ScanMode, ScanOptions, ScanSession, SessionMode};
pub use types::{BarcodeFormat, Color, SessionId};
