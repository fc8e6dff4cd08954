//! SQLite-backed append-only audit log.
//!
//! Entries are only ever inserted; the schema rejects UPDATE and DELETE on
//! `audit_log` with triggers. Timestamps are stored as microseconds.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use tracing::debug;

use warden_core::error::WardenError;
use warden_core::store::AuditLog;
use warden_core::types::{AuditEntry, BatchId, Outcome};

use crate::db::Database;

/// Durable [`AuditLog`] on top of the shared [`Database`].
pub struct SqliteAuditLog {
    db: Arc<Database>,
}

impl SqliteAuditLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Most recent entries across all batches, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, WardenError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT recorded_at, batch_id, action_index, kind, decision, rule_id,
                            outcome, detail, reason, action_json
                     FROM audit_log
                     ORDER BY seq DESC
                     LIMIT ?1",
                )
                .map_err(|e| WardenError::Storage(format!("Audit query prepare: {}", e)))?;

            let rows = stmt
                .query_map(rusqlite::params![limit as i64], read_row)
                .map_err(|e| WardenError::Storage(format!("Audit query: {}", e)))?;

            rows.map(|row| {
                row.map_err(|e| WardenError::Storage(e.to_string()))?
                    .into_entry()
            })
            .collect()
        })
    }
}

impl AuditLog for SqliteAuditLog {
    fn append(&self, entry: &AuditEntry) -> Result<(), WardenError> {
        let action_json = entry
            .action
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO audit_log
                    (recorded_at, batch_id, action_index, kind, decision, rule_id,
                     outcome, detail, reason, action_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    entry.timestamp.timestamp_micros(),
                    entry.batch_id.to_string(),
                    entry.action_index as i64,
                    entry.kind,
                    entry.decision.to_string(),
                    entry.rule_id,
                    entry.outcome.label(),
                    entry.outcome.detail(),
                    entry.reason,
                    action_json,
                ],
            )
            .map_err(|e| WardenError::Storage(format!("Failed to append audit entry: {}", e)))?;

            debug!(
                batch_id = %entry.batch_id,
                action_index = entry.action_index,
                decision = %entry.decision,
                outcome = entry.outcome.label(),
                "Audit entry appended"
            );
            Ok(())
        })
    }

    fn query(&self, batch_id: BatchId) -> Result<Vec<AuditEntry>, WardenError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT recorded_at, batch_id, action_index, kind, decision, rule_id,
                            outcome, detail, reason, action_json
                     FROM audit_log
                     WHERE batch_id = ?1
                     ORDER BY seq ASC",
                )
                .map_err(|e| WardenError::Storage(format!("Audit query prepare: {}", e)))?;

            let rows = stmt
                .query_map(rusqlite::params![batch_id.to_string()], read_row)
                .map_err(|e| WardenError::Storage(format!("Audit query: {}", e)))?;

            rows.map(|row| {
                row.map_err(|e| WardenError::Storage(e.to_string()))?
                    .into_entry()
            })
            .collect()
        })
    }
}

/// Raw column values of one `audit_log` row.
struct AuditRow {
    recorded_at: i64,
    batch_id: String,
    action_index: i64,
    kind: String,
    decision: String,
    rule_id: Option<String>,
    outcome: String,
    detail: Option<String>,
    reason: String,
    action_json: Option<String>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<AuditRow> {
    Ok(AuditRow {
        recorded_at: row.get(0)?,
        batch_id: row.get(1)?,
        action_index: row.get(2)?,
        kind: row.get(3)?,
        decision: row.get(4)?,
        rule_id: row.get(5)?,
        outcome: row.get(6)?,
        detail: row.get(7)?,
        reason: row.get(8)?,
        action_json: row.get(9)?,
    })
}

impl AuditRow {
    fn into_entry(self) -> Result<AuditEntry, WardenError> {
        let action = self
            .action_json
            .map(|raw| serde_json::from_str(&raw))
            .transpose()?;
        Ok(AuditEntry {
            timestamp: micros_to_datetime(self.recorded_at),
            batch_id: self.batch_id.parse().map_err(WardenError::Storage)?,
            action_index: self.action_index as usize,
            kind: self.kind,
            decision: self.decision.parse().map_err(WardenError::Storage)?,
            rule_id: self.rule_id,
            outcome: Outcome::from_parts(&self.outcome, self.detail)
                .map_err(WardenError::Storage)?,
            reason: self.reason,
            action,
        })
    }
}

fn micros_to_datetime(micros: i64) -> DateTime<Utc> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos).unwrap_or_default()
}
