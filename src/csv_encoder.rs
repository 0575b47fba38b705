use std::io::Write;

use crate::Result;
use crate::exporter::{EXPORT_COLUMNS, ExportRecord};

/// Streams export records as CSV.
///
/// The header row is always the first row, even when no records are written. Quoting of
/// embedded commas, quotes, and newlines (transcripts are multi-line) is handled by `csv`.
pub struct CsvEncoder<W: Write> {
    w: csv::Writer<W>,

    /// Whether the header row has been written.
    started: bool,

    /// Whether the encoder has been closed.
    closed: bool,
}

impl<W: Write> CsvEncoder<W> {
    pub fn new(w: W) -> Self {
        Self {
            w: csv::WriterBuilder::new().has_headers(false).from_writer(w),
            started: false,
            closed: false,
        }
    }

    fn start_if_needed(&mut self) -> Result<()> {
        if !self.started {
            self.w.write_record(EXPORT_COLUMNS)?;
            self.started = true;
        }
        Ok(())
    }

    pub fn write_record(&mut self, record: &ExportRecord) -> Result<()> {
        if self.closed {
            return Err(crate::Error::msg(
                "cannot write record: encoder is already closed",
            ));
        }

        self.start_if_needed()?;
        self.w.write_record([
            record.original_file_name.as_str(),
            record.file_path.as_str(),
            record.transcript_text.as_str(),
        ])?;
        Ok(())
    }

    /// Write the header if nothing was written yet, then flush. Safe to call twice.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.start_if_needed()?;
        self.w.flush()?;

        self.closed = true;
        Ok(())
    }
}
