//! Action engine for Warden.
//!
//! Classifies proposed actions against policy, runs the permitted ones,
//! parks the ones needing operator confirmation, and keeps the audit trail.

pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod lock;
pub mod orchestrator;
pub mod policy;
pub mod sweeper;

pub use error::{ExecutionError, OrchestratorError, PolicyError};
pub use executor::{ActionExecutor, ExecutionReport, HostExecutor};
pub use lifecycle::{ActionState, Lifecycle};
pub use lock::BatchLocks;
pub use orchestrator::{
    ActionReport, ActionStatus, BatchReport, ExpiryReport, OperatorDecision, Orchestrator,
    ReplayEntry, ResolutionReport,
};
pub use policy::{evaluate, RuleSet};
pub use sweeper::ExpirySweeper;
