//! Keyed async locks, one per batch id.
//!
//! Processing, confirmation, and expiry of the same batch are serialized;
//! different batches never wait on each other. Entries are dropped from the
//! map once no guard or waiter holds them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use warden_core::types::BatchId;

type Slot = Arc<AsyncMutex<()>>;

#[derive(Default)]
pub struct BatchLocks {
    slots: Arc<Mutex<HashMap<BatchId, Slot>>>,
}

impl BatchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one batch.
    pub async fn lock(&self, batch_id: BatchId) -> BatchGuard {
        let slot = {
            let mut slots = match self.slots.lock() {
                Ok(slots) => slots,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(slots.entry(batch_id).or_default())
        };

        let guard = Arc::clone(&slot).lock_owned().await;
        BatchGuard {
            batch_id,
            slot,
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of batches with a live guard or waiter.
    pub fn active(&self) -> usize {
        match self.slots.lock() {
            Ok(slots) => slots.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// Exclusive access to one batch, released on drop.
pub struct BatchGuard {
    batch_id: BatchId,
    slot: Slot,
    slots: Arc<Mutex<HashMap<BatchId, Slot>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        // Release the async lock before deciding whether the slot is idle.
        self.guard.take();

        let mut slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };
        // One reference in the map, one held here.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.batch_id);
        }
    }
}
