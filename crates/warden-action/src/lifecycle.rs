//! Per-action state machine with validated transitions.
//!
//! Enforces the allowed lifecycle of one action inside a batch:
//! Proposed -> Evaluated -> Executing -> Executed/Failed
//! Evaluated -> AwaitingConfirmation -> Approved -> Executing
//! AwaitingConfirmation -> Rejected/Expired
//! Evaluated -> Denied/Skipped

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// Lifecycle state of a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Proposed,
    Evaluated,
    Executing,
    Executed,
    Failed,
    AwaitingConfirmation,
    Approved,
    Rejected,
    Denied,
    Skipped,
    Expired,
}

impl ActionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionState::Executed
                | ActionState::Failed
                | ActionState::Rejected
                | ActionState::Denied
                | ActionState::Skipped
                | ActionState::Expired
        )
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionState::Proposed => write!(f, "proposed"),
            ActionState::Evaluated => write!(f, "evaluated"),
            ActionState::Executing => write!(f, "executing"),
            ActionState::Executed => write!(f, "executed"),
            ActionState::Failed => write!(f, "failed"),
            ActionState::AwaitingConfirmation => write!(f, "awaiting_confirmation"),
            ActionState::Approved => write!(f, "approved"),
            ActionState::Rejected => write!(f, "rejected"),
            ActionState::Denied => write!(f, "denied"),
            ActionState::Skipped => write!(f, "skipped"),
            ActionState::Expired => write!(f, "expired"),
        }
    }
}

/// Validate that a state transition is allowed.
///
/// Valid transitions:
/// - Proposed -> Evaluated
/// - Evaluated -> Executing
/// - Evaluated -> AwaitingConfirmation
/// - Evaluated -> Denied
/// - Evaluated -> Skipped (sequential batch after a failure)
/// - Executing -> Executed
/// - Executing -> Failed
/// - AwaitingConfirmation -> Approved
/// - AwaitingConfirmation -> Rejected
/// - AwaitingConfirmation -> Expired
/// - Approved -> Executing
pub fn validate_transition(from: ActionState, to: ActionState) -> Result<(), OrchestratorError> {
    let valid = matches!(
        (from, to),
        (ActionState::Proposed, ActionState::Evaluated)
            | (ActionState::Evaluated, ActionState::Executing)
            | (ActionState::Evaluated, ActionState::AwaitingConfirmation)
            | (ActionState::Evaluated, ActionState::Denied)
            | (ActionState::Evaluated, ActionState::Skipped)
            | (ActionState::Executing, ActionState::Executed)
            | (ActionState::Executing, ActionState::Failed)
            | (ActionState::AwaitingConfirmation, ActionState::Approved)
            | (ActionState::AwaitingConfirmation, ActionState::Rejected)
            | (ActionState::AwaitingConfirmation, ActionState::Expired)
            | (ActionState::Approved, ActionState::Executing)
    );

    if valid {
        Ok(())
    } else {
        Err(OrchestratorError::InvalidTransition(from, to))
    }
}

/// Tracks one action through its lifecycle, rejecting invalid moves.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: ActionState,
}

impl Lifecycle {
    /// A freshly proposed action.
    pub fn proposed() -> Self {
        Self {
            state: ActionState::Proposed,
        }
    }

    /// An action restored from the pending store.
    pub fn awaiting() -> Self {
        Self {
            state: ActionState::AwaitingConfirmation,
        }
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn advance(&mut self, to: ActionState) -> Result<(), OrchestratorError> {
        validate_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }
}
