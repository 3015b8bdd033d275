//! Run statistics and audit records
//!
//! # Overview
//!
//! - [`RunStats`] - accumulator threaded through one extraction run
//! - [`RunAudit`] - immutable summary written once the run completes
//! - [`AuditStore`] - persists audits and finds the previous run of a repository
//!
//! Audits are observability only; nothing reads them to make correctness
//! decisions.

mod stats;
mod store;
mod types;

pub use stats::RunStats;
pub use store::AuditStore;
pub use types::{FetchParams, RunAudit, RunRef, RunResults, METHOD_VERSION};

#[cfg(test)]
mod tests;
