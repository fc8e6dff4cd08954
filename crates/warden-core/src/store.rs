//! Persistence seams for pending confirmations and the audit trail.
//!
//! The orchestrator only talks to these traits. `warden-storage` provides
//! the durable SQLite implementations; the in-memory versions here back
//! unit tests and dry runs.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, WardenError};
use crate::types::{AuditEntry, BatchId, PendingRecord, PendingStatus};

/// Durable record of actions awaiting operator confirmation.
///
/// Implementations must make every write durable before returning and must
/// serialize mutations of the same batch.
pub trait PendingStore: Send + Sync {
    /// Persist a new record. Fails if the batch already has one.
    fn put(&self, record: &PendingRecord) -> Result<()>;

    /// Fetch a record, or `WardenError::NotFound`.
    fn get(&self, batch_id: BatchId) -> Result<PendingRecord>;

    /// Move one action to a new status. Terminal actions are never changed;
    /// attempts fail with `WardenError::StatusConflict`.
    fn update_status(
        &self,
        batch_id: BatchId,
        action_index: usize,
        status: PendingStatus,
    ) -> Result<PendingRecord>;

    /// Records with at least one action still awaiting confirmation,
    /// oldest first.
    fn list_awaiting(&self) -> Result<Vec<PendingRecord>>;

    /// Drop a fully resolved record.
    fn remove(&self, batch_id: BatchId) -> Result<()>;
}

/// Append-only audit trail.
pub trait AuditLog: Send + Sync {
    /// Append one entry. Errors mean the entry was not recorded.
    fn append(&self, entry: &AuditEntry) -> Result<()>;

    /// Full history of a batch in append order.
    fn query(&self, batch_id: BatchId) -> Result<Vec<AuditEntry>>;
}

/// Validate a pending status transition.
///
/// Valid transitions:
/// - Awaiting -> Approved
/// - Awaiting -> Rejected
/// - Awaiting -> Expired
pub fn check_transition(
    batch_id: BatchId,
    action_index: usize,
    from: PendingStatus,
    to: PendingStatus,
) -> Result<()> {
    let valid = matches!(
        (from, to),
        (PendingStatus::Awaiting, PendingStatus::Approved)
            | (PendingStatus::Awaiting, PendingStatus::Rejected)
            | (PendingStatus::Awaiting, PendingStatus::Expired)
    );

    if valid {
        Ok(())
    } else {
        Err(WardenError::StatusConflict {
            batch_id,
            action_index,
            from,
            to,
        })
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> WardenError {
    WardenError::Storage(format!("Lock poisoned: {}", e))
}

/// In-memory pending store.
#[derive(Default)]
pub struct MemoryPendingStore {
    records: Mutex<HashMap<BatchId, PendingRecord>>,
}

impl MemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingStore for MemoryPendingStore {
    fn put(&self, record: &PendingRecord) -> Result<()> {
        let mut records = self.records.lock().map_err(poisoned)?;
        if records.contains_key(&record.batch_id) {
            return Err(WardenError::DuplicateBatch(record.batch_id));
        }
        records.insert(record.batch_id, record.clone());
        Ok(())
    }

    fn get(&self, batch_id: BatchId) -> Result<PendingRecord> {
        let records = self.records.lock().map_err(poisoned)?;
        records
            .get(&batch_id)
            .cloned()
            .ok_or(WardenError::NotFound(batch_id))
    }

    fn update_status(
        &self,
        batch_id: BatchId,
        action_index: usize,
        status: PendingStatus,
    ) -> Result<PendingRecord> {
        let mut records = self.records.lock().map_err(poisoned)?;
        let record = records
            .get_mut(&batch_id)
            .ok_or(WardenError::NotFound(batch_id))?;
        let action = record
            .actions
            .iter_mut()
            .find(|a| a.action_index == action_index)
            .ok_or(WardenError::UnknownAction {
                batch_id,
                action_index,
            })?;

        check_transition(batch_id, action_index, action.status, status)?;
        action.status = status;
        Ok(record.clone())
    }

    fn list_awaiting(&self) -> Result<Vec<PendingRecord>> {
        let records = self.records.lock().map_err(poisoned)?;
        let mut awaiting: Vec<PendingRecord> = records
            .values()
            .filter(|r| r.awaiting().next().is_some())
            .cloned()
            .collect();
        awaiting.sort_by_key(|r| (r.created_at, r.batch_id));
        Ok(awaiting)
    }

    fn remove(&self, batch_id: BatchId) -> Result<()> {
        let mut records = self.records.lock().map_err(poisoned)?;
        records.remove(&batch_id);
        Ok(())
    }
}

/// In-memory audit log.
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry across all batches, in append order.
    pub fn all(&self) -> Vec<AuditEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => vec![],
        }
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, entry: &AuditEntry) -> Result<()> {
        self.entries.lock().map_err(poisoned)?.push(entry.clone());
        Ok(())
    }

    fn query(&self, batch_id: BatchId) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries
            .iter()
            .filter(|e| e.batch_id == batch_id)
            .cloned()
            .collect())
    }
}
