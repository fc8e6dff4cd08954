//! SQLite-backed pending confirmation store.
//!
//! Each record spans one `pending_batches` row and one `pending_actions` row
//! per parked action. Multi-row writes run inside a transaction so a crash
//! never leaves a half-written record behind.

use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use warden_core::error::WardenError;
use warden_core::store::{check_transition, PendingStore};
use warden_core::types::{BatchId, PendingAction, PendingRecord, PendingStatus, Timestamp};

use crate::db::Database;

/// Durable [`PendingStore`] on top of the shared [`Database`].
pub struct SqlitePendingStore {
    db: Arc<Database>,
}

impl SqlitePendingStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl PendingStore for SqlitePendingStore {
    fn put(&self, record: &PendingRecord) -> Result<(), WardenError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| WardenError::Storage(format!("Failed to begin transaction: {}", e)))?;

            if batch_exists(&tx, record.batch_id)? {
                return Err(WardenError::DuplicateBatch(record.batch_id));
            }

            tx.execute(
                "INSERT INTO pending_batches (batch_id, created_at) VALUES (?1, ?2)",
                rusqlite::params![record.batch_id.to_string(), record.created_at.0],
            )
            .map_err(|e| WardenError::Storage(format!("Failed to save pending batch: {}", e)))?;

            for action in &record.actions {
                let action_json = serde_json::to_string(&action.action)?;
                tx.execute(
                    "INSERT INTO pending_actions (batch_id, action_index, action_json, rule_id, reason, status)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        record.batch_id.to_string(),
                        action.action_index as i64,
                        action_json,
                        action.rule_id,
                        action.reason,
                        action.status.to_string(),
                    ],
                )
                .map_err(|e| {
                    WardenError::Storage(format!("Failed to save pending action: {}", e))
                })?;
            }

            tx.commit()
                .map_err(|e| WardenError::Storage(format!("Failed to commit pending batch: {}", e)))?;
            debug!(batch_id = %record.batch_id, actions = record.actions.len(), "Pending record stored");
            Ok(())
        })
    }

    fn get(&self, batch_id: BatchId) -> Result<PendingRecord, WardenError> {
        self.db.with_conn(|conn| load_record(conn, batch_id))
    }

    fn update_status(
        &self,
        batch_id: BatchId,
        action_index: usize,
        status: PendingStatus,
    ) -> Result<PendingRecord, WardenError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| WardenError::Storage(format!("Failed to begin transaction: {}", e)))?;

            let current: Option<String> = tx
                .query_row(
                    "SELECT status FROM pending_actions WHERE batch_id = ?1 AND action_index = ?2",
                    rusqlite::params![batch_id.to_string(), action_index as i64],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| WardenError::Storage(e.to_string()))?;

            let current = match current {
                Some(raw) => raw.parse::<PendingStatus>().map_err(WardenError::Storage)?,
                None if batch_exists(&tx, batch_id)? => {
                    return Err(WardenError::UnknownAction {
                        batch_id,
                        action_index,
                    })
                }
                None => return Err(WardenError::NotFound(batch_id)),
            };

            check_transition(batch_id, action_index, current, status)?;

            tx.execute(
                "UPDATE pending_actions
                 SET status = ?3, updated_at = strftime('%s', 'now')
                 WHERE batch_id = ?1 AND action_index = ?2",
                rusqlite::params![batch_id.to_string(), action_index as i64, status.to_string()],
            )
            .map_err(|e| WardenError::Storage(format!("Failed to update pending status: {}", e)))?;

            tx.commit()
                .map_err(|e| WardenError::Storage(format!("Failed to commit status update: {}", e)))?;

            load_record(conn, batch_id)
        })
    }

    fn list_awaiting(&self) -> Result<Vec<PendingRecord>, WardenError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT b.batch_id
                     FROM pending_batches b
                     WHERE EXISTS (
                         SELECT 1 FROM pending_actions a
                         WHERE a.batch_id = b.batch_id AND a.status = 'awaiting'
                     )
                     ORDER BY b.created_at ASC, b.batch_id ASC",
                )
                .map_err(|e| WardenError::Storage(format!("Awaiting query prepare: {}", e)))?;

            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| WardenError::Storage(format!("Awaiting query: {}", e)))?;

            let mut ids = Vec::new();
            for row in rows {
                let raw = row.map_err(|e| WardenError::Storage(e.to_string()))?;
                ids.push(raw.parse::<BatchId>().map_err(WardenError::Storage)?);
            }

            ids.into_iter().map(|id| load_record(conn, id)).collect()
        })
    }

    fn remove(&self, batch_id: BatchId) -> Result<(), WardenError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM pending_batches WHERE batch_id = ?1",
                rusqlite::params![batch_id.to_string()],
            )
            .map_err(|e| WardenError::Storage(format!("Failed to remove pending batch: {}", e)))?;
            debug!(batch_id = %batch_id, "Pending record removed");
            Ok(())
        })
    }
}

fn batch_exists(conn: &Connection, batch_id: BatchId) -> Result<bool, WardenError> {
    conn.query_row(
        "SELECT 1 FROM pending_batches WHERE batch_id = ?1",
        rusqlite::params![batch_id.to_string()],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .map_err(|e| WardenError::Storage(e.to_string()))
}

fn load_record(conn: &Connection, batch_id: BatchId) -> Result<PendingRecord, WardenError> {
    let created_at: Option<i64> = conn
        .query_row(
            "SELECT created_at FROM pending_batches WHERE batch_id = ?1",
            rusqlite::params![batch_id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| WardenError::Storage(e.to_string()))?;

    let created_at = created_at.ok_or(WardenError::NotFound(batch_id))?;

    let mut stmt = conn
        .prepare(
            "SELECT action_index, action_json, rule_id, reason, status
             FROM pending_actions
             WHERE batch_id = ?1
             ORDER BY action_index ASC",
        )
        .map_err(|e| WardenError::Storage(format!("Pending query prepare: {}", e)))?;

    let rows = stmt
        .query_map(rusqlite::params![batch_id.to_string()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })
        .map_err(|e| WardenError::Storage(format!("Pending query: {}", e)))?;

    let mut actions = Vec::new();
    for row in rows {
        let (index, action_json, rule_id, reason, status) =
            row.map_err(|e| WardenError::Storage(e.to_string()))?;
        actions.push(PendingAction {
            action_index: index as usize,
            action: serde_json::from_str(&action_json)?,
            rule_id,
            reason,
            status: status.parse().map_err(WardenError::Storage)?,
        });
    }

    Ok(PendingRecord {
        batch_id,
        created_at: Timestamp(created_at),
        actions,
    })
}
