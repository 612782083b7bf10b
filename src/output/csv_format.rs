//! CSV output formatting.

use crate::scanner::DetectionResult;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct Row<'a> {
    session: String,
    format: &'a str,
    text: &'a str,
    template: String,
    detected_at: String,
}

/// Append one result. The header is written before the first row.
pub fn write_csv_row<W: Write>(wtr: &mut csv::Writer<W>, result: &DetectionResult) -> io::Result<()> {
    wtr.serialize(Row {
        session: result.session.to_string(),
        format: result.format.as_str(),
        text: &result.text,
        template: result.template.map(|t| t.to_string()).unwrap_or_default(),
        detected_at: result.detected_at.to_rfc3339(),
    })?;
    Ok(())
}
