//! Bounded pending-operation window.
//!
//! Caps the number of cache operations in flight at once. Excess operations
//! queue FIFO on the semaphore and are never dropped; every queued operation
//! eventually acquires a permit or fails explicitly.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::errors::{CacheError, CacheResult};

/// FIFO-fair bound on concurrently in-flight cache operations.
#[derive(Debug, Clone)]
pub struct PendingWindow {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl PendingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a slot in the window. Waiters are served in arrival order.
    pub async fn acquire(&self) -> CacheResult<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| CacheError::Unavailable("pending window closed".into()))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free; `capacity - in_flight`.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}
