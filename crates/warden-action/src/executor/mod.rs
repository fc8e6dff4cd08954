//! Action executor contract.
//!
//! The orchestrator hands each permitted action to an [`ActionExecutor`] and
//! records whatever comes back. Executors never see policy; they only run
//! what they are given.

pub mod host;

pub use host::HostExecutor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use warden_core::types::{Action, Outcome};

use crate::error::ExecutionError;

/// Result of running one action against the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ExecutionReport {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: Some(error.into()),
        }
    }

    /// Convert into the outcome stored in the audit log.
    pub fn into_outcome(self) -> Outcome {
        if self.success {
            Outcome::Success {
                output: self.output,
            }
        } else {
            let error = match self.error {
                Some(error) if !error.is_empty() => error,
                _ if !self.output.is_empty() => self.output,
                _ => "action failed".to_string(),
            };
            Outcome::Failure { error }
        }
    }
}

/// Runs a single action. Implementations must be safe to share across
/// concurrently processed batches.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &Action) -> Result<ExecutionReport, ExecutionError>;
}
