//! Per-provider schedule locks.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use ephra_core::ServiceError;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

/// Serializes read-check-write sequences on one provider's schedule.
///
/// Different providers never block each other. The map holds one entry
/// per provider that was ever locked and entries are never evicted, so its
/// size is bounded by the provider directory.
#[derive(Debug)]
pub struct ProviderLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl ProviderLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    /// Waits up to the configured timeout for the provider's lock.
    ///
    /// Timing out yields a retryable [`ServiceError::Contention`].
    pub async fn acquire(&self, provider_id: &str) -> Result<OwnedMutexGuard<()>, ServiceError> {
        // Clone the Arc out so the map shard is not held across the await.
        let mutex = self
            .locks
            .entry(provider_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        match tokio::time::timeout(self.timeout, mutex.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                warn!(provider_id, timeout = ?self.timeout, "Provider schedule lock timed out");
                Err(ServiceError::contention(format!(
                    "Schedule for care provider {provider_id} is busy, please retry"
                )))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
