//! Global concurrency limiting for fetches

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps the number of fetches in flight
///
/// Every fetch holds a [`FetchPermit`] for its whole duration. Dropping the
/// permit releases the slot, so a slot is returned on success, on error, and
/// when the holding task is aborted or panics. Waiters are admitted in FIFO
/// order.
///
/// Cloning is cheap; clones share the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held fetch slot
#[derive(Debug)]
pub struct FetchPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Creates a limiter allowing `capacity` concurrent fetches
    ///
    /// A capacity of 0 is raised to 1; a capacity of 1 makes the crawl fully
    /// sequential.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot
    ///
    /// Returns `None` only if the limiter was closed, which never happens in
    /// normal operation.
    pub async fn acquire(&self) -> Option<FetchPermit> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        Some(FetchPermit { _permit: permit })
    }

    /// Maximum number of concurrent fetches
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}
