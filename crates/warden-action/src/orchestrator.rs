//! Action engine orchestrator.
//!
//! Coordinates the full pipeline for a batch: policy evaluation, immediate
//! execution of allowed actions, parking of actions that need confirmation,
//! and the audit trail. Also resolves confirmations and expires stale ones.
//!
//! Every executor call is preceded by an audit entry recording ALLOW or
//! APPROVED for that action. If that entry cannot be written, the action is
//! not run. All work on one batch is serialized through [`BatchLocks`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use warden_core::error::WardenError;
use warden_core::store::{AuditLog, PendingStore};
use warden_core::types::{
    Action, ActionBatch, AuditDecision, AuditEntry, BatchId, Decision, ExecutionMode, Outcome,
    PendingAction, PendingRecord, PendingStatus, Timestamp, Verdict,
};

use crate::error::{ExecutionError, OrchestratorError};
use crate::executor::ActionExecutor;
use crate::lifecycle::{ActionState, Lifecycle};
use crate::lock::BatchLocks;
use crate::policy::{self, RuleSet};

/// Reason recorded for sequential-mode actions after a failure.
pub const PRIOR_STEP_FAILED: &str = "prior step failed";
/// Reason recorded when an operator rejects an action.
pub const OPERATOR_REJECTED: &str = "operator rejected";
/// Reason recorded when an operator approves an action.
pub const OPERATOR_APPROVED: &str = "operator approved";
/// Reason recorded when a confirmation expires.
pub const CONFIRMATION_EXPIRED: &str = "confirmation expired";
/// Failure detail for an approved action whose execution result was lost.
pub const OUTCOME_UNKNOWN: &str = "outcome unknown";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// =============================================================================
// Reports
// =============================================================================

/// What happened to one action of a processed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionStatus {
    Executed { outcome: Outcome },
    Denied,
    Pending,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub index: usize,
    pub kind: String,
    pub verdict: Verdict,
    pub status: ActionStatus,
}

/// Per-action results of [`Orchestrator::process`], in batch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub mode: ExecutionMode,
    pub actions: Vec<ActionReport>,
}

impl BatchReport {
    /// Indices parked for operator confirmation.
    pub fn pending_indices(&self) -> Vec<usize> {
        self.actions
            .iter()
            .filter(|a| a.status == ActionStatus::Pending)
            .map(|a| a.index)
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.actions.iter().any(|a| {
            matches!(
                a.status,
                ActionStatus::Executed {
                    outcome: Outcome::Failure { .. }
                }
            )
        })
    }
}

/// Operator answer to a pending confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorDecision {
    Approve,
    Reject,
}

impl fmt::Display for OperatorDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorDecision::Approve => write!(f, "approve"),
            OperatorDecision::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for OperatorDecision {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" | "approved" | "yes" => Ok(OperatorDecision::Approve),
            "reject" | "rejected" | "no" => Ok(OperatorDecision::Reject),
            _ => Err(format!("Unknown operator decision: {}", s)),
        }
    }
}

/// Result of resolving one pending action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub batch_id: BatchId,
    pub action_index: usize,
    pub status: PendingStatus,
    pub outcome: Outcome,
    /// True when an earlier interrupted resolution was completed instead of
    /// starting a new one.
    pub recovered: bool,
}

/// Result of an expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryReport {
    pub batches: usize,
    pub actions: usize,
}

/// Recorded policy decision next to a fresh evaluation of the same action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub action_index: usize,
    pub kind: String,
    pub recorded: AuditDecision,
    pub recorded_rule: Option<String>,
    pub replayed: Verdict,
}

impl ReplayEntry {
    pub fn changed(&self) -> bool {
        self.recorded != AuditDecision::from(self.replayed.decision)
            || self.recorded_rule != self.replayed.rule_id
    }
}

// =============================================================================
// Resolution kinds
// =============================================================================

/// Terminal move for a pending action, from the operator or the sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Approve,
    Reject,
    Expire,
}

impl Resolution {
    fn from_audit(decision: AuditDecision) -> Option<Self> {
        match decision {
            AuditDecision::Approved => Some(Resolution::Approve),
            AuditDecision::Rejected => Some(Resolution::Reject),
            AuditDecision::Expired => Some(Resolution::Expire),
            AuditDecision::Allow | AuditDecision::Deny | AuditDecision::Confirm => None,
        }
    }

    fn audit_decision(self) -> AuditDecision {
        match self {
            Resolution::Approve => AuditDecision::Approved,
            Resolution::Reject => AuditDecision::Rejected,
            Resolution::Expire => AuditDecision::Expired,
        }
    }

    fn status(self) -> PendingStatus {
        match self {
            Resolution::Approve => PendingStatus::Approved,
            Resolution::Reject => PendingStatus::Rejected,
            Resolution::Expire => PendingStatus::Expired,
        }
    }

    fn state(self) -> ActionState {
        match self {
            Resolution::Approve => ActionState::Approved,
            Resolution::Reject => ActionState::Rejected,
            Resolution::Expire => ActionState::Expired,
        }
    }
}

impl From<OperatorDecision> for Resolution {
    fn from(decision: OperatorDecision) -> Self {
        match decision {
            OperatorDecision::Approve => Resolution::Approve,
            OperatorDecision::Reject => Resolution::Reject,
        }
    }
}

/// First resolution recorded in the audit trail for an action, if any.
fn recorded_resolution(history: &[AuditEntry], action_index: usize) -> Option<Resolution> {
    history
        .iter()
        .filter(|e| e.action_index == action_index)
        .find_map(|e| Resolution::from_audit(e.decision))
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Drives batches through policy, execution, confirmation, and audit.
pub struct Orchestrator {
    pending: Arc<dyn PendingStore>,
    audit: Arc<dyn AuditLog>,
    executor: Arc<dyn ActionExecutor>,
    locks: BatchLocks,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        pending: Arc<dyn PendingStore>,
        audit: Arc<dyn AuditLog>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        Self {
            pending,
            audit,
            executor,
            locks: BatchLocks::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Upper bound for a single executor call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Records still awaiting confirmation, oldest first.
    pub fn pending(&self) -> Result<Vec<PendingRecord>, OrchestratorError> {
        Ok(self.pending.list_awaiting()?)
    }

    /// Full audit history of a batch.
    pub fn history(&self, batch_id: BatchId) -> Result<Vec<AuditEntry>, OrchestratorError> {
        Ok(self.audit.query(batch_id)?)
    }

    /// Evaluate and run a new batch.
    ///
    /// Allowed actions run in order as they are reached; CONFIRM actions are
    /// stored as one pending record once the whole batch is classified. A
    /// batch id that already has audit history is rejected.
    pub async fn process(
        &self,
        batch: &ActionBatch,
        rules: &RuleSet,
    ) -> Result<BatchReport, OrchestratorError> {
        let batch_id = batch.batch_id;
        let _guard = self.locks.lock(batch_id).await;

        if !self.audit.query(batch_id)?.is_empty() {
            return Err(OrchestratorError::DuplicateBatch(batch_id));
        }

        info!(
            batch_id = %batch_id,
            actions = batch.actions.len(),
            mode = %batch.mode,
            "Processing batch"
        );

        let mut reports = Vec::with_capacity(batch.actions.len());
        let mut parked = Vec::new();
        let mut halted = false;

        for (index, action) in batch.actions.iter().enumerate() {
            let mut lifecycle = Lifecycle::proposed();
            let verdict = policy::evaluate(action, rules);
            lifecycle.advance(ActionState::Evaluated)?;

            debug!(
                batch_id = %batch_id,
                action_index = index,
                decision = %verdict.decision,
                rule_id = verdict.rule_id.as_deref().unwrap_or("-"),
                "Action evaluated"
            );

            let reason = if halted {
                PRIOR_STEP_FAILED.to_string()
            } else {
                verdict.reason.clone()
            };
            self.audit.append(
                &AuditEntry::new(
                    batch_id,
                    index,
                    action.kind.as_str(),
                    verdict.decision.into(),
                    Outcome::NotRun,
                    reason,
                )
                .with_rule(verdict.rule_id.clone())
                .with_action(action.clone()),
            )?;

            if halted {
                lifecycle.advance(ActionState::Skipped)?;
                reports.push(ActionReport {
                    index,
                    kind: action.kind.clone(),
                    verdict,
                    status: ActionStatus::Skipped,
                });
                continue;
            }

            let status = match verdict.decision {
                Decision::Allow => {
                    lifecycle.advance(ActionState::Executing)?;
                    let outcome = self.run(batch_id, index, action).await;
                    self.audit.append(
                        &AuditEntry::new(
                            batch_id,
                            index,
                            action.kind.as_str(),
                            AuditDecision::Allow,
                            outcome.clone(),
                            verdict.reason.clone(),
                        )
                        .with_rule(verdict.rule_id.clone()),
                    )?;

                    let failed = matches!(outcome, Outcome::Failure { .. });
                    lifecycle.advance(if failed {
                        ActionState::Failed
                    } else {
                        ActionState::Executed
                    })?;

                    if failed && batch.mode == ExecutionMode::Sequential {
                        warn!(
                            batch_id = %batch_id,
                            action_index = index,
                            "Action failed, skipping the rest of the sequential batch"
                        );
                        halted = true;
                    }
                    ActionStatus::Executed { outcome }
                }
                Decision::Deny => {
                    lifecycle.advance(ActionState::Denied)?;
                    info!(batch_id = %batch_id, action_index = index, reason = %verdict.reason, "Action denied");
                    ActionStatus::Denied
                }
                Decision::Confirm => {
                    lifecycle.advance(ActionState::AwaitingConfirmation)?;
                    parked.push(PendingAction {
                        action_index: index,
                        action: action.clone(),
                        rule_id: verdict.rule_id.clone(),
                        reason: verdict.reason.clone(),
                        status: PendingStatus::Awaiting,
                    });
                    ActionStatus::Pending
                }
            };

            reports.push(ActionReport {
                index,
                kind: action.kind.clone(),
                verdict,
                status,
            });
        }

        if !parked.is_empty() {
            let record = PendingRecord {
                batch_id,
                created_at: batch.created_at,
                actions: parked,
            };
            if let Err(e) = self.pending.put(&record) {
                error!(
                    batch_id = %batch_id,
                    pending = record.actions.len(),
                    error = %e,
                    "Pending record not stored; it is rebuilt from the audit trail on resolve"
                );
                return Err(OrchestratorError::from_store(e));
            }
            info!(
                batch_id = %batch_id,
                pending = record.actions.len(),
                "Actions awaiting confirmation"
            );
        }

        Ok(BatchReport {
            batch_id,
            mode: batch.mode,
            actions: reports,
        })
    }

    /// Apply an operator decision to one pending action, or to every
    /// awaiting action of the batch when `action_index` is `None`.
    ///
    /// A record missing from the store is rebuilt from the CONFIRM verdicts
    /// in the audit trail. When several actions are resolved and one fails,
    /// the ones already done come back in `PartialResolution`.
    pub async fn resolve(
        &self,
        batch_id: BatchId,
        decision: OperatorDecision,
        action_index: Option<usize>,
    ) -> Result<Vec<ResolutionReport>, OrchestratorError> {
        let _guard = self.locks.lock(batch_id).await;

        let record = match self.pending.get(batch_id) {
            Ok(record) => record,
            Err(WardenError::NotFound(_)) => match self.rebuild_record(batch_id)? {
                Some(record) => record,
                None => return Err(self.absent_record(batch_id, action_index)?),
            },
            Err(e) => return Err(OrchestratorError::Persistence(e)),
        };

        let targets: Vec<PendingAction> = match action_index {
            Some(index) => {
                let target = record
                    .action(index)
                    .ok_or(OrchestratorError::UnknownAction {
                        batch_id,
                        action_index: index,
                    })?;
                if target.status.is_terminal() {
                    return Err(OrchestratorError::ConflictingStatus {
                        batch_id,
                        action_index: index,
                        status: target.status,
                    });
                }
                vec![target.clone()]
            }
            None => record.awaiting().cloned().collect(),
        };

        if targets.is_empty() {
            self.finish(batch_id)?;
            return Err(match record.actions.first() {
                Some(first) => OrchestratorError::ConflictingStatus {
                    batch_id,
                    action_index: first.action_index,
                    status: first.status,
                },
                None => OrchestratorError::NotFound(batch_id),
            });
        }

        info!(
            batch_id = %batch_id,
            decision = %decision,
            actions = targets.len(),
            "Resolving confirmation"
        );

        let history = self.audit.query(batch_id)?;
        let mut results = Vec::with_capacity(targets.len());
        let mut failure = None;
        for target in &targets {
            match self
                .resolve_action(&history, batch_id, target, decision.into())
                .await
            {
                Ok(result) => results.push(result),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        self.finish(batch_id)?;
        match failure {
            Some(e) if results.is_empty() => Err(e),
            Some(e) => Err(OrchestratorError::PartialResolution {
                completed: results,
                source: Box::new(e),
            }),
            None => Ok(results),
        }
    }

    /// Expire awaiting actions of records created at least `max_age` ago.
    /// Expired actions are never executed. Running it twice is harmless.
    pub async fn expire_stale(&self, max_age: Duration) -> Result<ExpiryReport, OrchestratorError> {
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        let cutoff = Timestamp::now().0.saturating_sub(max_age);
        let mut report = ExpiryReport::default();

        for stale in self.pending.list_awaiting()? {
            if stale.created_at.0 > cutoff {
                continue;
            }

            let batch_id = stale.batch_id;
            let _guard = self.locks.lock(batch_id).await;

            // Re-read under the lock; an operator may have resolved it.
            let record = match self.pending.get(batch_id) {
                Ok(record) => record,
                Err(WardenError::NotFound(_)) => continue,
                Err(e) => return Err(OrchestratorError::Persistence(e)),
            };

            let history = self.audit.query(batch_id)?;
            let mut expired = 0;
            for target in record.awaiting() {
                match self
                    .resolve_action(&history, batch_id, target, Resolution::Expire)
                    .await
                {
                    Ok(result) if result.status == PendingStatus::Expired => expired += 1,
                    Ok(_) => {}
                    Err(OrchestratorError::ConflictingStatus { status, .. }) => {
                        info!(
                            batch_id = %batch_id,
                            action_index = target.action_index,
                            status = %status,
                            "Completed earlier resolution instead of expiring"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }

            self.finish(batch_id)?;
            if expired > 0 {
                info!(batch_id = %batch_id, actions = expired, "Expired stale confirmations");
                report.batches += 1;
                report.actions += expired;
            }
        }

        Ok(report)
    }

    /// Re-evaluate the recorded actions of a batch against `rules`.
    pub fn replay(
        &self,
        batch_id: BatchId,
        rules: &RuleSet,
    ) -> Result<Vec<ReplayEntry>, OrchestratorError> {
        let history = self.audit.query(batch_id)?;
        if history.is_empty() {
            return Err(OrchestratorError::NotFound(batch_id));
        }

        Ok(history
            .iter()
            .filter_map(|entry| {
                let action = entry.action.as_ref()?;
                Some(ReplayEntry {
                    action_index: entry.action_index,
                    kind: entry.kind.clone(),
                    recorded: entry.decision,
                    recorded_rule: entry.rule_id.clone(),
                    replayed: policy::evaluate(action, rules),
                })
            })
            .collect())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Run one action with the configured timeout. Never fails; problems
    /// become a FAILURE outcome.
    async fn run(&self, batch_id: BatchId, action_index: usize, action: &Action) -> Outcome {
        match tokio::time::timeout(self.timeout, self.executor.execute(action)).await {
            Ok(Ok(report)) => {
                let outcome = report.into_outcome();
                info!(
                    batch_id = %batch_id,
                    action_index,
                    outcome = outcome.label(),
                    "Action executed"
                );
                outcome
            }
            Ok(Err(e)) => {
                warn!(batch_id = %batch_id, action_index, error = %e, "Action failed");
                Outcome::Failure {
                    error: e.to_string(),
                }
            }
            Err(_) => {
                let e = ExecutionError::Timeout(self.timeout);
                warn!(
                    batch_id = %batch_id,
                    action_index,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Action timed out"
                );
                Outcome::Failure {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Move one awaiting action to a terminal status.
    ///
    /// A resolution already present in the audit trail wins over the
    /// requested one: it is completed (without re-executing) and, if it
    /// differs from the request, reported as a conflict.
    async fn resolve_action(
        &self,
        history: &[AuditEntry],
        batch_id: BatchId,
        target: &PendingAction,
        requested: Resolution,
    ) -> Result<ResolutionReport, OrchestratorError> {
        let index = target.action_index;
        let recorded = recorded_resolution(history, index);
        let resolution = recorded.unwrap_or(requested);

        let mut lifecycle = Lifecycle::awaiting();
        lifecycle.advance(resolution.state())?;

        let (outcome, recovered) = match resolution {
            Resolution::Approve => {
                self.execute_approved(history, batch_id, target, &mut lifecycle)
                    .await?
            }
            Resolution::Reject | Resolution::Expire => {
                if recorded.is_none() {
                    let reason = match resolution {
                        Resolution::Expire => CONFIRMATION_EXPIRED,
                        _ => OPERATOR_REJECTED,
                    };
                    self.audit.append(
                        &AuditEntry::new(
                            batch_id,
                            index,
                            target.action.kind.as_str(),
                            resolution.audit_decision(),
                            Outcome::NotRun,
                            reason,
                        )
                        .with_rule(target.rule_id.clone()),
                    )?;
                }
                (Outcome::NotRun, recorded.is_some())
            }
        };

        self.pending
            .update_status(batch_id, index, resolution.status())
            .map_err(OrchestratorError::from_store)?;

        if recovered {
            warn!(
                batch_id = %batch_id,
                action_index = index,
                status = %resolution.status(),
                "Completed interrupted resolution"
            );
        }

        if resolution != requested {
            return Err(OrchestratorError::ConflictingStatus {
                batch_id,
                action_index: index,
                status: resolution.status(),
            });
        }

        Ok(ResolutionReport {
            batch_id,
            action_index: index,
            status: resolution.status(),
            outcome,
            recovered,
        })
    }

    /// Run an approved action unless an earlier attempt is on record.
    async fn execute_approved(
        &self,
        history: &[AuditEntry],
        batch_id: BatchId,
        target: &PendingAction,
        lifecycle: &mut Lifecycle,
    ) -> Result<(Outcome, bool), OrchestratorError> {
        let index = target.action_index;
        let kind = target.action.kind.as_str();
        let attempts: Vec<&AuditEntry> = history
            .iter()
            .filter(|e| e.action_index == index && e.decision == AuditDecision::Approved)
            .collect();

        lifecycle.advance(ActionState::Executing)?;

        let (outcome, recovered) = if let Some(done) = attempts.iter().find(|e| e.outcome.is_execution()) {
            (done.outcome.clone(), true)
        } else if !attempts.is_empty() {
            let outcome = Outcome::Failure {
                error: OUTCOME_UNKNOWN.to_string(),
            };
            self.audit.append(
                &AuditEntry::new(
                    batch_id,
                    index,
                    kind,
                    AuditDecision::Approved,
                    outcome.clone(),
                    OPERATOR_APPROVED,
                )
                .with_rule(target.rule_id.clone()),
            )?;
            (outcome, true)
        } else {
            self.audit.append(
                &AuditEntry::new(
                    batch_id,
                    index,
                    kind,
                    AuditDecision::Approved,
                    Outcome::NotRun,
                    OPERATOR_APPROVED,
                )
                .with_rule(target.rule_id.clone()),
            )?;
            let outcome = self.run(batch_id, index, &target.action).await;
            self.audit.append(
                &AuditEntry::new(
                    batch_id,
                    index,
                    kind,
                    AuditDecision::Approved,
                    outcome.clone(),
                    OPERATOR_APPROVED,
                )
                .with_rule(target.rule_id.clone()),
            )?;
            (outcome, false)
        };

        lifecycle.advance(match outcome {
            Outcome::Failure { .. } => ActionState::Failed,
            _ => ActionState::Executed,
        })?;
        Ok((outcome, recovered))
    }

    /// Error for a resolution request whose record no longer exists.
    /// Recreate a pending record that never reached the store, from the
    /// CONFIRM verdicts in the audit trail. Returns `None` when the trail
    /// has no parked action left awaiting a decision.
    fn rebuild_record(&self, batch_id: BatchId) -> Result<Option<PendingRecord>, OrchestratorError> {
        let history = self.audit.query(batch_id)?;
        let Some(first) = history.first() else {
            return Ok(None);
        };

        let actions: Vec<PendingAction> = history
            .iter()
            .filter(|e| {
                e.decision == AuditDecision::Confirm
                    && e.outcome == Outcome::NotRun
                    && e.reason != PRIOR_STEP_FAILED
            })
            .filter_map(|e| {
                let action = e.action.clone()?;
                let status = recorded_resolution(&history, e.action_index)
                    .map_or(PendingStatus::Awaiting, Resolution::status);
                Some(PendingAction {
                    action_index: e.action_index,
                    action,
                    rule_id: e.rule_id.clone(),
                    reason: e.reason.clone(),
                    status,
                })
            })
            .collect();
        if actions.iter().all(|a| a.status.is_terminal()) {
            return Ok(None);
        }

        let record = PendingRecord {
            batch_id,
            created_at: Timestamp::from_datetime(first.timestamp),
            actions,
        };
        self.pending
            .put(&record)
            .map_err(OrchestratorError::from_store)?;
        warn!(
            batch_id = %batch_id,
            actions = record.actions.len(),
            "Rebuilt missing pending record from the audit trail"
        );
        Ok(Some(record))
    }

    fn absent_record(
        &self,
        batch_id: BatchId,
        action_index: Option<usize>,
    ) -> Result<OrchestratorError, OrchestratorError> {
        let history = self.audit.query(batch_id)?;
        let resolved = history.iter().find_map(|e| {
            let resolution = Resolution::from_audit(e.decision)?;
            match action_index {
                Some(index) if index != e.action_index => None,
                _ => Some((e.action_index, resolution.status())),
            }
        });

        Ok(match resolved {
            Some((action_index, status)) => OrchestratorError::ConflictingStatus {
                batch_id,
                action_index,
                status,
            },
            None => OrchestratorError::NotFound(batch_id),
        })
    }

    /// Drop the record once every action in it is terminal.
    fn finish(&self, batch_id: BatchId) -> Result<(), OrchestratorError> {
        match self.pending.get(batch_id) {
            Ok(record) if record.is_resolved() => {
                self.pending.remove(batch_id)?;
                info!(batch_id = %batch_id, "Pending record resolved");
                Ok(())
            }
            Ok(_) | Err(WardenError::NotFound(_)) => Ok(()),
            Err(e) => Err(OrchestratorError::Persistence(e)),
        }
    }
}
