//! File-backed checkpoint store

use super::atomic::write_atomic;
use super::types::{Checkpoint, CURRENT_VERSION};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of checkpoint files
pub const STATE_FILE_EXTENSION: &str = "state";

/// Directory-safe file name for a resource key
pub fn file_name_for(resource: &str) -> String {
    let safe: String = resource
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    format!("{safe}.{STATE_FILE_EXTENSION}")
}

/// Stores one checkpoint file per resource under a state directory
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// The state directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the checkpoint for `resource` lives
    pub fn path_for(&self, resource: &str) -> PathBuf {
        self.dir.join(file_name_for(resource))
    }

    /// Seal and atomically persist `checkpoint`, returning the sealed copy
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<Checkpoint> {
        let sealed = checkpoint.clone().seal()?;
        let path = self.path_for(&sealed.repository);
        let contents = serde_json::to_vec(&sealed)?;

        write_atomic(&path, &contents).await.map_err(|e| {
            Error::checkpoint(format!(
                "Failed to write state file {}: {e}",
                path.display()
            ))
        })?;

        debug!(
            repository = %sealed.repository,
            last_id = sealed.last_id,
            path = %path.display(),
            "Checkpoint saved"
        );
        Ok(sealed)
    }

    /// Load and validate the checkpoint for `resource`
    ///
    /// The checksum is verified before the version, so an edited file reads
    /// as corrupt while an intact file from another schema reads as
    /// incompatible.
    pub async fn load(&self, resource: &str) -> Result<Checkpoint> {
        let path = self.path_for(resource);
        let display = path.display().to_string();

        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::CheckpointMissing {
                    resource: resource.to_string(),
                    path: display,
                });
            }
            Err(e) => {
                return Err(Error::checkpoint(format!(
                    "Failed to read state file {display}: {e}"
                )))
            }
        };

        let checkpoint: Checkpoint = serde_json::from_slice(&contents)
            .map_err(|e| Error::checkpoint_corrupt(&display, format!("invalid JSON: {e}")))?;

        if !checkpoint.verify()? {
            return Err(Error::checkpoint_corrupt(&display, "checksum mismatch"));
        }

        if checkpoint.version != CURRENT_VERSION {
            return Err(Error::CheckpointIncompatible {
                path: display,
                found: checkpoint.version,
                expected: CURRENT_VERSION,
            });
        }

        Ok(checkpoint)
    }

    /// Remove the checkpoint for `resource`; a missing file is not an error
    pub async fn delete(&self, resource: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(resource)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::checkpoint(format!(
                "Failed to delete state file: {e}"
            ))),
        }
    }
}
