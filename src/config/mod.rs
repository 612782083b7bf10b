//! Configuration management for qrscan.
//!
//! Settings are stored as JSON in the platform config directory and supply
//! defaults for both generation and scanning.

mod settings;

pub use settings::{AppSettings, Paths};
