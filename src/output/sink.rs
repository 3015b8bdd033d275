//! Record sink abstraction

use crate::error::{Error, Result};
use crate::github::PullRequest;

/// Destination for extracted records
///
/// The engine calls `write` once per record in strict arrival order from a
/// single task, then `close` once.
pub trait RecordSink: Send {
    /// Take ownership of one record
    fn write(&mut self, record: PullRequest) -> Result<()>;

    /// Push buffered records to their destination
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Flush and release the sink
    fn close(&mut self) -> Result<()>;
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn write(&mut self, record: PullRequest) -> Result<()> {
        (**self).write(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// In-memory sink
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// Records in write order
    pub records: Vec<PullRequest>,
    /// Whether `close` was called
    pub closed: bool,
    fail_at: Option<usize>,
}

impl CollectingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the write that would store the `n`-th record (1-based)
    #[must_use]
    pub fn fail_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }

    /// Numbers of the collected records
    pub fn numbers(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.number).collect()
    }
}

impl RecordSink for CollectingSink {
    fn write(&mut self, record: PullRequest) -> Result<()> {
        if self.fail_at == Some(self.records.len() + 1) {
            return Err(Error::output(format!(
                "refusing record #{}",
                record.number
            )));
        }
        self.records.push(record);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
