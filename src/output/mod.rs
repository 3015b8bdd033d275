//! Output module
//!
//! Record sinks the extraction engine streams into.
//!
//! # Overview
//!
//! - [`RecordSink`] - one record at a time, in arrival order, then `close`
//! - [`NdjsonWriter`] - newline-delimited JSON to stdout or a file
//! - [`CollectingSink`] - keeps records in memory, for tests

mod sink;
mod writer;

pub use sink::{CollectingSink, RecordSink};
pub use writer::{NdjsonWriter, WRITE_BUFFER_SIZE};
