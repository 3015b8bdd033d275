//! Audit persistence

use super::types::RunAudit;
use crate::checkpoint::write_atomic;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes audits under `<state_dir>/runs/<owner>-<name>/`
#[derive(Debug, Clone)]
pub struct AuditStore {
    dir: PathBuf,
}

impl AuditStore {
    /// Create a store rooted at the state directory
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: state_dir.as_ref().join("runs"),
        }
    }

    /// Directory holding the audits of `resource`
    pub fn runs_dir(&self, resource: &str) -> PathBuf {
        self.dir.join(resource.replace(['/', '\\'], "-"))
    }

    /// Persist `audit`, and also to `extra` when given
    pub async fn save(&self, audit: &RunAudit, extra: Option<&Path>) -> Result<PathBuf> {
        let contents = serde_json::to_vec_pretty(audit)?;
        let path = self
            .runs_dir(&audit.repository_key())
            .join(format!("{}.json", audit.run_id));

        write_atomic(&path, &contents)
            .await
            .map_err(|e| Error::audit(format!("Failed to write {}: {e}", path.display())))?;

        if let Some(extra) = extra {
            write_atomic(extra, &contents)
                .await
                .map_err(|e| Error::audit(format!("Failed to write {}: {e}", extra.display())))?;
        }

        debug!(run_id = %audit.run_id, path = %path.display(), "Audit saved");
        Ok(path)
    }

    /// The most recently completed audit of `resource`
    ///
    /// Unreadable files are skipped.
    pub async fn latest(&self, resource: &str) -> Result<Option<RunAudit>> {
        let dir = self.runs_dir(resource);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::audit(format!(
                    "Failed to list {}: {e}",
                    dir.display()
                )))
            }
        };

        let mut latest: Option<RunAudit> = None;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let audit = match tokio::fs::read(&path).await.map_err(Error::from).and_then(|bytes| {
                serde_json::from_slice::<RunAudit>(&bytes).map_err(Error::from)
            }) {
                Ok(audit) => audit,
                Err(e) => {
                    debug!(path = %path.display(), "Skipping unreadable audit: {}", e);
                    continue;
                }
            };

            if audit.repository_key() != resource {
                continue;
            }
            let newer = latest
                .as_ref()
                .map_or(true, |l| audit.results.completed_at > l.results.completed_at);
            if newer {
                latest = Some(audit);
            }
        }

        Ok(latest)
    }
}
