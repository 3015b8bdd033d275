//! Checkpoint persistence
//!
//! A checkpoint records how far extraction of one repository got, so an
//! interrupted or later run can resume without refetching.
//!
//! # Integrity
//!
//! Every saved checkpoint carries a SHA-256 checksum over its other fields
//! and a schema version. Files are written to a unique temporary file in the
//! target directory, synced, then renamed over the target, so a reader never
//! observes a partial write. Concurrent saves of the same key are not
//! coordinated: the last rename wins.

mod atomic;
mod pending;
mod store;
mod types;

pub use atomic::write_atomic;
pub use pending::PendingCheckpoint;
pub use store::{file_name_for, CheckpointStore, STATE_FILE_EXTENSION};
pub use types::{Checkpoint, CURRENT_VERSION};
