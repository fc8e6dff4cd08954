//! Warden Storage crate - SQLite persistence for pending confirmations and
//! the audit trail.
//!
//! Provides a WAL-mode SQLite database with migrations, a durable pending
//! store, and an append-only audit log sharing one connection.

pub mod audit;
pub mod db;
pub mod migrations;
pub mod pending;

pub use audit::SqliteAuditLog;
pub use db::Database;
pub use pending::SqlitePendingStore;
