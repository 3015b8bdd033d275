//! NDJSON writer

use super::sink::RecordSink;
use crate::error::{Error, Result};
use crate::github::PullRequest;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Buffer size for output writes (64 KiB)
pub const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Writes one JSON object per line
pub struct NdjsonWriter<W: Write> {
    writer: BufWriter<W>,
    records_written: u64,
}

impl<W: Write> NdjsonWriter<W> {
    /// Wrap any writer
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, inner),
            records_written: 0,
        }
    }

    /// Number of records written so far
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flush and return the inner writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::output(format!("Failed to flush output: {}", e.error())))
    }
}

impl NdjsonWriter<io::Stdout> {
    /// Write to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl NdjsonWriter<File> {
    /// Create (or truncate) a file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::Output {
                message: format!("Failed to create directory {}: {e}", parent.display()),
            })?;
        }
        let file = File::create(path).map_err(|e| Error::Output {
            message: format!("Failed to create file {}: {e}", path.display()),
        })?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> RecordSink for NdjsonWriter<W> {
    fn write(&mut self, record: PullRequest) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &record).map_err(|e| Error::Output {
            message: format!("Failed to encode record #{}: {e}", record.number),
        })?;
        self.writer.write_all(b"\n").map_err(|e| Error::Output {
            message: format!("Failed to write record: {e}"),
        })?;

        self.records_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| Error::Output {
            message: format!("Failed to flush output: {e}"),
        })
    }

    fn close(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| Error::Output {
            message: format!("Failed to flush output: {e}"),
        })
    }
}

impl<W: Write> std::fmt::Debug for NdjsonWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdjsonWriter")
            .field("records_written", &self.records_written)
            .finish_non_exhaustive()
    }
}
