//! JSON output formatting.

use crate::scanner::DetectionResult;
use std::io::{self, Write};

/// Write one result as a single JSON line.
pub fn write_json_line<W: Write>(out: &mut W, result: &DetectionResult) -> io::Result<()> {
    serde_json::to_writer(&mut *out, result).map_err(io::Error::other)?;
    writeln!(out)
}
