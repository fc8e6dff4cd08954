use thiserror::Error;

use crate::types::{BatchId, PendingStatus};

/// Top-level error type for the Warden system.
///
/// Subsystem crates define their own error types and wrap `WardenError`
/// where storage or configuration is involved, so the `?` operator works
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WardenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Pending batch not found: {0}")]
    NotFound(BatchId),

    #[error("Pending batch already exists: {0}")]
    DuplicateBatch(BatchId),

    #[error("Batch {batch_id} has no pending action at index {action_index}")]
    UnknownAction { batch_id: BatchId, action_index: usize },

    #[error("Action {action_index} of batch {batch_id} is already {from}, cannot become {to}")]
    StatusConflict {
        batch_id: BatchId,
        action_index: usize,
        from: PendingStatus,
        to: PendingStatus,
    },
}

impl From<toml::de::Error> for WardenError {
    fn from(err: toml::de::Error) -> Self {
        WardenError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for WardenError {
    fn from(err: toml::ser::Error) -> Self {
        WardenError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(err: serde_json::Error) -> Self {
        WardenError::Serialization(err.to_string())
    }
}

/// Planner output that cannot be turned into a typed operation.
///
/// Never fatal: the policy evaluator maps it to a CONFIRM verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable action: {0}")]
pub struct MalformedAction(pub String);

/// A specialized `Result` type for Warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
