pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::WardenConfig;
pub use error::{MalformedAction, Result, WardenError};
pub use store::{AuditLog, MemoryAuditLog, MemoryPendingStore, PendingStore};
pub use types::*;
