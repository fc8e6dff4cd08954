//! Error types for the action engine.

use std::time::Duration;

use warden_core::error::WardenError;
use warden_core::types::{BatchId, PendingStatus};

use crate::lifecycle::ActionState;
use crate::orchestrator::ResolutionReport;

/// Errors from loading or building a policy rule set.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Rule {rule_id}: invalid pattern: {source}")]
    InvalidPattern {
        rule_id: String,
        #[source]
        source: regex::Error,
    },
    #[error("Duplicate rule id: {0}")]
    DuplicateRuleId(String),
    #[error("Rule {rule_id}: {message}")]
    InvalidRule { rule_id: String, message: String },
    #[error("Failed to load rule set: {0}")]
    Load(String),
}

/// Errors from an executor call. Always recorded as a FAILURE outcome.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("{0}")]
    Failed(String),
    #[error("timeout")]
    Timeout(Duration),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Storage failed; the operation stopped before any unaudited execution.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] WardenError),
    #[error("No pending record for batch {0}")]
    NotFound(BatchId),
    #[error("Action {action_index} of batch {batch_id} is already {status}")]
    ConflictingStatus {
        batch_id: BatchId,
        action_index: usize,
        status: PendingStatus,
    },
    #[error("Batch {batch_id} has no pending action at index {action_index}")]
    UnknownAction { batch_id: BatchId, action_index: usize },
    #[error("Batch {0} was already processed")]
    DuplicateBatch(BatchId),
    #[error("Invalid action state transition: {0} -> {1}")]
    InvalidTransition(ActionState, ActionState),
    /// Resolving several actions stopped partway; `completed` already ran.
    #[error("Resolution stopped after {} completed action(s): {source}", .completed.len())]
    PartialResolution {
        completed: Vec<ResolutionReport>,
        #[source]
        source: Box<OrchestratorError>,
    },
}

impl OrchestratorError {
    /// Lift store-level errors into their orchestrator equivalents.
    pub(crate) fn from_store(err: WardenError) -> Self {
        match err {
            WardenError::NotFound(batch_id) => OrchestratorError::NotFound(batch_id),
            WardenError::UnknownAction {
                batch_id,
                action_index,
            } => OrchestratorError::UnknownAction {
                batch_id,
                action_index,
            },
            WardenError::StatusConflict {
                batch_id,
                action_index,
                from,
                ..
            } => OrchestratorError::ConflictingStatus {
                batch_id,
                action_index,
                status: from,
            },
            WardenError::DuplicateBatch(batch_id) => OrchestratorError::DuplicateBatch(batch_id),
            other => OrchestratorError::Persistence(other),
        }
    }
}
