//! In-flight checkpoint shared with the transport

use super::store::CheckpointStore;
use super::types::Checkpoint;
use crate::error::Result;
use crate::http::WaitHook;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Latest unsaved progress of a running extraction
///
/// The orchestrator updates it as pages drain; the transport flushes it
/// before sleeping through a rate-limit window.
#[derive(Debug)]
pub struct PendingCheckpoint {
    store: CheckpointStore,
    current: Mutex<Option<Checkpoint>>,
}

impl PendingCheckpoint {
    /// Create an empty pending checkpoint for `store`
    pub fn new(store: CheckpointStore) -> Self {
        Self {
            store,
            current: Mutex::new(None),
        }
    }

    /// Replace the in-flight progress
    pub async fn update(&self, checkpoint: Checkpoint) {
        *self.current.lock().await = Some(checkpoint);
    }

    /// Forget the in-flight progress
    pub async fn clear(&self) {
        *self.current.lock().await = None;
    }

    /// The in-flight progress, if any
    pub async fn snapshot(&self) -> Option<Checkpoint> {
        self.current.lock().await.clone()
    }

    /// Persist the in-flight progress, if any
    pub async fn flush(&self) -> Result<Option<Checkpoint>> {
        let current = self.current.lock().await;
        match current.as_ref() {
            Some(checkpoint) => self.store.save(checkpoint).await.map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl WaitHook for PendingCheckpoint {
    async fn before_wait(&self, wait: Duration) {
        match self.flush().await {
            Ok(Some(saved)) => info!(
                repository = %saved.repository,
                last_id = saved.last_id,
                wait_secs = wait.as_secs(),
                "Saved progress before rate limit wait"
            ),
            Ok(None) => {}
            Err(e) => warn!("Failed to save progress before rate limit wait: {}", e),
        }
    }
}
