//! Checkpoint type and checksum

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Schema version written by this build
pub const CURRENT_VERSION: u32 = 1;

/// Durable progress marker for one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Schema version
    pub version: u32,
    /// SHA-256 over the other fields, hex encoded
    pub checksum: String,
    /// `owner/name`
    pub repository: String,
    /// Highest record number observed
    pub last_id: u64,
    /// Creation time of the most recently observed record
    pub last_record_at: DateTime<Utc>,
    /// When the run that wrote this checkpoint finished
    pub last_run_at: DateTime<Utc>,
    /// Records processed across runs
    pub total_processed: u64,
}

impl Checkpoint {
    /// Create an unsealed checkpoint
    pub fn new(
        repository: impl Into<String>,
        last_id: u64,
        last_record_at: DateTime<Utc>,
        total_processed: u64,
    ) -> Self {
        Self {
            version: CURRENT_VERSION,
            checksum: String::new(),
            repository: repository.into(),
            last_id,
            last_record_at,
            last_run_at: Utc::now(),
            total_processed,
        }
    }

    /// Checksum over every field except `checksum`
    pub fn compute_checksum(&self) -> Result<String> {
        let unsealed = Self {
            checksum: String::new(),
            ..self.clone()
        };
        let bytes = serde_json::to_vec(&unsealed)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Normalize the version and set the checksum
    pub fn seal(mut self) -> Result<Self> {
        self.version = CURRENT_VERSION;
        self.checksum = self.compute_checksum()?;
        Ok(self)
    }

    /// Whether the stored checksum matches the content
    pub fn verify(&self) -> Result<bool> {
        Ok(self.compute_checksum()? == self.checksum)
    }
}
