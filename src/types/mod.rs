//! Core value types shared by the encoder and the scan engine.
//!
//! Parsing lives on the types themselves (`FromStr`) so invalid colors and
//! format names are rejected at the boundary.

mod color;
mod format;
mod session_id;

pub use color::{Color, ColorError};
pub use format::BarcodeFormat;
pub use session_id::{SessionId, SessionIdError};
