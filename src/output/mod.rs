//! Output formatting module.
//!
//! Writes scan results as plain text, JSON lines or CSV. Results arrive one
//! at a time from continuous scans, so every format is streamable.

mod csv_format;
mod json_format;
mod plain;

pub use plain::{
    print_error, print_generated, print_info, print_scan_header, print_success, print_warning,
};

use crate::cli::OutputFormat;
use crate::scanner::DetectionResult;
use std::io::{self, Write};

enum Sink<W: Write> {
    Plain(W),
    Json(W),
    Csv(csv::Writer<W>),
}

/// Streams results in one output format.
pub struct ResultWriter<W: Write> {
    sink: Sink<W>,
    written: usize,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(format: OutputFormat, out: W) -> Self {
        let sink = match format {
            OutputFormat::Plain => Sink::Plain(out),
            OutputFormat::Json => Sink::Json(out),
            OutputFormat::Csv => Sink::Csv(csv::Writer::from_writer(out)),
        };
        Self { sink, written: 0 }
    }

    /// Write one result and flush it.
    pub fn write(&mut self, result: &DetectionResult) -> io::Result<()> {
        match &mut self.sink {
            Sink::Plain(out) => {
                plain::write_plain(out, result)?;
                out.flush()?;
            }
            Sink::Json(out) => {
                json_format::write_json_line(out, result)?;
                out.flush()?;
            }
            Sink::Csv(wtr) => {
                csv_format::write_csv_row(wtr, result)?;
                wtr.flush()?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Number of results written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> io::Result<W> {
        match self.sink {
            Sink::Plain(mut out) | Sink::Json(mut out) => {
                out.flush()?;
                Ok(out)
            }
            Sink::Csv(wtr) => wtr.into_inner().map_err(|e| e.into_error()),
        }
    }
}

impl ResultWriter<io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, io::stdout())
    }
}
