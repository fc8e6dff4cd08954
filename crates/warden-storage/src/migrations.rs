//! Database schema migrations.
//!
//! Applies the initial schema: pending_batches, pending_actions, the
//! append-only audit_log, and the schema_migrations bookkeeping table.

use rusqlite::Connection;
use tracing::info;

use warden_core::error::WardenError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), WardenError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| WardenError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| WardenError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), WardenError> {
    conn.execute_batch(
        "
        -- One row per batch that has actions awaiting confirmation.
        CREATE TABLE IF NOT EXISTS pending_batches (
            batch_id        TEXT PRIMARY KEY NOT NULL,
            created_at      INTEGER NOT NULL
        );

        -- CONFIRM actions of a pending batch, keyed by their batch position.
        CREATE TABLE IF NOT EXISTS pending_actions (
            batch_id        TEXT NOT NULL,
            action_index    INTEGER NOT NULL,
            action_json     TEXT NOT NULL,
            rule_id         TEXT,
            reason          TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'awaiting'
                            CHECK (status IN ('awaiting', 'approved', 'rejected', 'expired')),
            updated_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            PRIMARY KEY (batch_id, action_index),
            FOREIGN KEY (batch_id) REFERENCES pending_batches(batch_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_pending_actions_status
            ON pending_actions (status, batch_id);

        -- Terminal statuses are final.
        CREATE TRIGGER IF NOT EXISTS pending_actions_terminal_guard
            BEFORE UPDATE OF status ON pending_actions
            WHEN OLD.status != 'awaiting'
        BEGIN
            SELECT RAISE(ABORT, 'pending action already resolved');
        END;

        -- Audit trail. seq gives the append order.
        CREATE TABLE IF NOT EXISTS audit_log (
            seq             INTEGER PRIMARY KEY AUTOINCREMENT,
            recorded_at     INTEGER NOT NULL,
            batch_id        TEXT NOT NULL,
            action_index    INTEGER NOT NULL,
            kind            TEXT NOT NULL DEFAULT '',
            decision        TEXT NOT NULL
                            CHECK (decision IN ('allow', 'deny', 'confirm', 'approved', 'rejected', 'expired')),
            rule_id         TEXT,
            outcome         TEXT NOT NULL
                            CHECK (outcome IN ('not_run', 'success', 'failure')),
            detail          TEXT,
            reason          TEXT NOT NULL DEFAULT '',
            action_json     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_audit_log_batch
            ON audit_log (batch_id, seq);

        CREATE TRIGGER IF NOT EXISTS audit_log_no_update
            BEFORE UPDATE ON audit_log
        BEGIN
            SELECT RAISE(ABORT, 'audit_log is append-only');
        END;

        CREATE TRIGGER IF NOT EXISTS audit_log_no_delete
            BEFORE DELETE ON audit_log
        BEGIN
            SELECT RAISE(ABORT, 'audit_log is append-only');
        END;

        -- Record migration.
        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| WardenError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
