//! Error types for qrscan.
//!
//! Uses `thiserror` for ergonomic error definitions.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while turning an [`EncodeRequest`](crate::encoder::EncodeRequest)
/// into an image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("failed to render image: {0}")]
    Render(String),
}

/// Result type alias for encode operations.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Terminal failures of a scan session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("scan cancelled by user")]
    CancelledByUser,

    #[error("session is {0}, expected {1}")]
    InvalidState(String, &'static str),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Failure of a single frame decode. Logged and dropped by the pipeline.
#[derive(Error, Debug, Clone)]
#[error("decode failed: {0}")]
pub struct DecodeError(pub String);

/// Configuration and settings errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("invalid setting: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by CLI subcommands.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
