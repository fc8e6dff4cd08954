use std::fmt;
use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{MalformedAction, WardenError};

// =============================================================================
// Newtype Wrappers - Identity / Temporal
// =============================================================================

/// Unique identifier for an action batch.
///
/// Generated once when the batch is created and used as the idempotency and
/// lookup key for pending records and audit history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BatchId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(BatchId)
            .map_err(|e| format!("Invalid batch id '{}': {}", s, e))
    }
}

/// Unix timestamp in seconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }

    pub fn age_secs(&self) -> u64 {
        (Timestamp::now().0 - self.0).max(0) as u64
    }
}

// =============================================================================
// Actions
// =============================================================================

/// Closed set of action kinds the agent knows how to evaluate and execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    FileWrite,
    PackageInstall,
    ServiceRestart,
    ShellCommand,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::FileWrite,
        ActionKind::PackageInstall,
        ActionKind::ServiceRestart,
        ActionKind::ShellCommand,
    ];

    /// Parameter names accepted for this kind, required ones first.
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            ActionKind::FileWrite => &["path", "content"],
            ActionKind::PackageInstall => &["name"],
            ActionKind::ServiceRestart => &["service"],
            ActionKind::ShellCommand => &["cmd"],
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::FileWrite => write!(f, "file-write"),
            ActionKind::PackageInstall => write!(f, "package-install"),
            ActionKind::ServiceRestart => write!(f, "service-restart"),
            ActionKind::ShellCommand => write!(f, "shell-command"),
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file-write" => Ok(ActionKind::FileWrite),
            "package-install" => Ok(ActionKind::PackageInstall),
            "service-restart" => Ok(ActionKind::ServiceRestart),
            "shell-command" => Ok(ActionKind::ShellCommand),
            _ => Err(format!("Unknown action kind: {}", s)),
        }
    }
}

/// Planner-supplied risk estimate. Informational only; policy never trusts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskHint {
    Low,
    Medium,
    High,
}

/// A single proposed system operation, as produced by the planner.
///
/// Shape problems found while reading planner output are kept on the action
/// itself (`shape_error`) instead of failing the whole batch, so the policy
/// evaluator can route the action to confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub kind: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_hint: Option<RiskHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_error: Option<String>,
}

impl Action {
    /// Build a well-formed action from a kind and string parameters.
    pub fn new(kind: ActionKind, parameters: &[(&str, &str)]) -> Self {
        let parameters = parameters
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        Self {
            kind: kind.to_string(),
            parameters,
            risk_hint: None,
            shape_error: None,
        }
    }

    /// Read one planner entry leniently. Never fails; problems are recorded
    /// in `shape_error`.
    pub fn from_value(value: Value) -> Self {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Self {
                    kind: String::new(),
                    parameters: Map::new(),
                    risk_hint: None,
                    shape_error: Some(format!("action must be an object, got {}", other)),
                }
            }
        };

        let mut problems = Vec::new();

        let kind = match obj.remove("kind") {
            Some(Value::String(kind)) => kind,
            Some(other) => {
                problems.push(format!("kind must be a string, got {}", other));
                String::new()
            }
            None => {
                problems.push("missing field `kind`".to_string());
                String::new()
            }
        };

        let parameters = match obj.remove("parameters") {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                problems.push(format!("parameters must be an object, got {}", other));
                Map::new()
            }
        };

        let risk_hint = match obj.remove("riskHint").or_else(|| obj.remove("risk_hint")) {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value::<RiskHint>(raw.clone()) {
                Ok(hint) => Some(hint),
                Err(_) => {
                    problems.push(format!("unrecognized riskHint {}", raw));
                    None
                }
            },
        };

        for key in obj.keys() {
            problems.push(format!("unknown field `{}`", key));
        }

        Self {
            kind,
            parameters,
            risk_hint,
            shape_error: if problems.is_empty() {
                None
            } else {
                Some(problems.join("; "))
            },
        }
    }

    /// Parse into the typed operation, validating every parameter.
    pub fn operation(&self) -> Result<Operation, MalformedAction> {
        if let Some(problem) = &self.shape_error {
            return Err(MalformedAction(problem.clone()));
        }
        let kind: ActionKind = self.kind.parse().map_err(MalformedAction)?;

        let allowed = kind.parameter_names();
        for (name, value) in &self.parameters {
            if !allowed.contains(&name.as_str()) {
                return Err(MalformedAction(format!(
                    "unexpected parameter `{}` for {}",
                    name, kind
                )));
            }
            if !value.is_string() {
                return Err(MalformedAction(format!(
                    "parameter `{}` must be a string",
                    name
                )));
            }
        }

        match kind {
            ActionKind::FileWrite => {
                let path = self.required("path")?;
                validate_path(path)?;
                let content = self
                    .parameters
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Ok(Operation::FileWrite {
                    path: path.to_string(),
                    content: content.to_string(),
                })
            }
            ActionKind::PackageInstall => {
                let name = self.required("name")?;
                if !is_valid_package_name(name) {
                    return Err(MalformedAction(format!("invalid package name '{}'", name)));
                }
                Ok(Operation::PackageInstall {
                    name: name.to_string(),
                })
            }
            ActionKind::ServiceRestart => {
                let service = self.required("service")?;
                if !is_valid_service_name(service) {
                    return Err(MalformedAction(format!(
                        "invalid service name '{}'",
                        service
                    )));
                }
                Ok(Operation::ServiceRestart {
                    service: service.to_string(),
                })
            }
            ActionKind::ShellCommand => {
                let cmd = self.required("cmd")?;
                if cmd.contains('\0') {
                    return Err(MalformedAction("command contains NUL byte".to_string()));
                }
                Ok(Operation::ShellCommand {
                    cmd: cmd.trim().to_string(),
                })
            }
        }
    }

    fn required(&self, name: &str) -> Result<&str, MalformedAction> {
        match self.parameters.get(name).and_then(Value::as_str) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            Some(_) => Err(MalformedAction(format!("parameter `{}` is empty", name))),
            None => Err(MalformedAction(format!("missing parameter `{}`", name))),
        }
    }

    /// Short human-readable description for logs and prompts.
    pub fn describe(&self) -> String {
        match self.operation() {
            Ok(op) => op.to_string(),
            Err(_) => format!("{} (unparseable)", self.kind),
        }
    }
}

fn validate_path(path: &str) -> Result<(), MalformedAction> {
    if path.contains('\0') {
        return Err(MalformedAction("path contains NUL byte".to_string()));
    }
    let p = Path::new(path);
    if !p.is_absolute() {
        return Err(MalformedAction(format!("path '{}' is not absolute", path)));
    }
    if p.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(MalformedAction(format!(
            "path '{}' contains parent directory segments",
            path
        )));
    }
    Ok(())
}

fn is_valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '-'))
}

fn is_valid_service_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | ':' | '-'))
}

/// Validated, typed form of an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    FileWrite { path: String, content: String },
    PackageInstall { name: String },
    ServiceRestart { service: String },
    ShellCommand { cmd: String },
}

impl Operation {
    pub fn kind(&self) -> ActionKind {
        match self {
            Operation::FileWrite { .. } => ActionKind::FileWrite,
            Operation::PackageInstall { .. } => ActionKind::PackageInstall,
            Operation::ServiceRestart { .. } => ActionKind::ServiceRestart,
            Operation::ShellCommand { .. } => ActionKind::ShellCommand,
        }
    }

    /// Look up a validated parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        match (self, name) {
            (Operation::FileWrite { path, .. }, "path") => Some(path),
            (Operation::FileWrite { content, .. }, "content") => Some(content),
            (Operation::PackageInstall { name }, "name") => Some(name),
            (Operation::ServiceRestart { service }, "service") => Some(service),
            (Operation::ShellCommand { cmd }, "cmd") => Some(cmd),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::FileWrite { path, content } => {
                write!(f, "write {} bytes to {}", content.len(), path)
            }
            Operation::PackageInstall { name } => write!(f, "install package {}", name),
            Operation::ServiceRestart { service } => write!(f, "restart service {}", service),
            Operation::ShellCommand { cmd } => write!(f, "run `{}`", cmd),
        }
    }
}

// =============================================================================
// Batches
// =============================================================================

/// How executor failures affect the rest of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Keep evaluating and running later actions after a failure.
    #[default]
    BestEffort,
    /// Stop at the first failure; later actions are never executed.
    Sequential,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::BestEffort => write!(f, "best_effort"),
            ExecutionMode::Sequential => write!(f, "sequential"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best_effort" => Ok(ExecutionMode::BestEffort),
            "sequential" => Ok(ExecutionMode::Sequential),
            _ => Err(format!("Unknown execution mode: {}", s)),
        }
    }
}

/// Ordered actions produced from one operator request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionBatch {
    pub batch_id: BatchId,
    pub actions: Vec<Action>,
    pub created_at: Timestamp,
    pub mode: ExecutionMode,
}

impl ActionBatch {
    pub fn new(actions: Vec<Action>, mode: ExecutionMode) -> Self {
        Self {
            batch_id: BatchId::new(),
            actions,
            created_at: Timestamp::now(),
            mode,
        }
    }

    /// Build a batch from planner JSON.
    ///
    /// Accepts either a bare array of actions or an object with an `actions`
    /// array and an optional `mode`. Individual malformed entries become
    /// actions carrying a shape error; only a payload that is not JSON or has
    /// no action list is rejected.
    pub fn from_planner_json(raw: &str, default_mode: ExecutionMode) -> Result<Self, WardenError> {
        let value: Value = serde_json::from_str(raw)?;
        let (entries, mode) = match value {
            Value::Array(entries) => (entries, default_mode),
            Value::Object(mut obj) => {
                let entries = match obj.remove("actions") {
                    Some(Value::Array(entries)) => entries,
                    _ => {
                        return Err(WardenError::Serialization(
                            "planner payload has no `actions` array".to_string(),
                        ))
                    }
                };
                let mode = match obj.get("mode").and_then(Value::as_str) {
                    Some(m) => m.parse().map_err(WardenError::Serialization)?,
                    None => default_mode,
                };
                (entries, mode)
            }
            _ => {
                return Err(WardenError::Serialization(
                    "planner payload must be an array or object".to_string(),
                ))
            }
        };

        let actions = entries.into_iter().map(Action::from_value).collect();
        Ok(Self::new(actions, mode))
    }
}

// =============================================================================
// Verdicts
// =============================================================================

/// Policy decision for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
    Confirm,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => write!(f, "allow"),
            Decision::Deny => write!(f, "deny"),
            Decision::Confirm => write!(f, "confirm"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Decision::Allow),
            "deny" => Ok(Decision::Deny),
            "confirm" => Ok(Decision::Confirm),
            _ => Err(format!("Unknown decision: {}", s)),
        }
    }
}

/// A policy verdict: decision, the rule that produced it, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: Decision,
    pub rule_id: Option<String>,
    pub reason: String,
}

impl Verdict {
    pub fn new(decision: Decision, rule_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            decision,
            rule_id,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Pending Records
// =============================================================================

/// Confirmation status of a parked action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Awaiting,
    Approved,
    Rejected,
    Expired,
}

impl PendingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PendingStatus::Awaiting)
    }
}

impl fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingStatus::Awaiting => write!(f, "awaiting"),
            PendingStatus::Approved => write!(f, "approved"),
            PendingStatus::Rejected => write!(f, "rejected"),
            PendingStatus::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for PendingStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting" => Ok(PendingStatus::Awaiting),
            "approved" => Ok(PendingStatus::Approved),
            "rejected" => Ok(PendingStatus::Rejected),
            "expired" => Ok(PendingStatus::Expired),
            _ => Err(format!("Unknown pending status: {}", s)),
        }
    }
}

/// One action parked for confirmation, with its position in the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub action_index: usize,
    pub action: Action,
    pub rule_id: Option<String>,
    pub reason: String,
    pub status: PendingStatus,
}

/// Durable unit of pending work: every CONFIRM action from one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub batch_id: BatchId,
    pub created_at: Timestamp,
    pub actions: Vec<PendingAction>,
}

impl PendingRecord {
    pub fn action(&self, action_index: usize) -> Option<&PendingAction> {
        self.actions.iter().find(|a| a.action_index == action_index)
    }

    pub fn awaiting(&self) -> impl Iterator<Item = &PendingAction> {
        self.actions
            .iter()
            .filter(|a| a.status == PendingStatus::Awaiting)
    }

    /// True once every action has reached a terminal status.
    pub fn is_resolved(&self) -> bool {
        self.actions.iter().all(|a| a.status.is_terminal())
    }
}

// =============================================================================
// Audit Entries
// =============================================================================

/// Decision recorded in the audit trail: a policy verdict or a later
/// operator/sweeper resolution of a CONFIRM verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDecision {
    Allow,
    Deny,
    Confirm,
    Approved,
    Rejected,
    Expired,
}

impl AuditDecision {
    /// Decisions under which an action may reach the executor.
    pub fn permits_execution(&self) -> bool {
        matches!(self, AuditDecision::Allow | AuditDecision::Approved)
    }
}

impl From<Decision> for AuditDecision {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Allow => AuditDecision::Allow,
            Decision::Deny => AuditDecision::Deny,
            Decision::Confirm => AuditDecision::Confirm,
        }
    }
}

impl fmt::Display for AuditDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditDecision::Allow => write!(f, "allow"),
            AuditDecision::Deny => write!(f, "deny"),
            AuditDecision::Confirm => write!(f, "confirm"),
            AuditDecision::Approved => write!(f, "approved"),
            AuditDecision::Rejected => write!(f, "rejected"),
            AuditDecision::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for AuditDecision {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(AuditDecision::Allow),
            "deny" => Ok(AuditDecision::Deny),
            "confirm" => Ok(AuditDecision::Confirm),
            "approved" => Ok(AuditDecision::Approved),
            "rejected" => Ok(AuditDecision::Rejected),
            "expired" => Ok(AuditDecision::Expired),
            _ => Err(format!("Unknown audit decision: {}", s)),
        }
    }
}

/// Execution outcome recorded with an audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    NotRun,
    Success { output: String },
    Failure { error: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::NotRun => "not_run",
            Outcome::Success { .. } => "success",
            Outcome::Failure { .. } => "failure",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Outcome::NotRun => None,
            Outcome::Success { output } => Some(output),
            Outcome::Failure { error } => Some(error),
        }
    }

    /// Rebuild from the stored label/detail pair.
    pub fn from_parts(label: &str, detail: Option<String>) -> Result<Self, String> {
        match label {
            "not_run" => Ok(Outcome::NotRun),
            "success" => Ok(Outcome::Success {
                output: detail.unwrap_or_default(),
            }),
            "failure" => Ok(Outcome::Failure {
                error: detail.unwrap_or_default(),
            }),
            _ => Err(format!("Unknown outcome: {}", label)),
        }
    }

    /// True for outcomes produced by an executor call.
    pub fn is_execution(&self) -> bool {
        !matches!(self, Outcome::NotRun)
    }
}

/// Immutable audit record for one decision or execution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub batch_id: BatchId,
    pub action_index: usize,
    pub kind: String,
    pub decision: AuditDecision,
    pub rule_id: Option<String>,
    pub outcome: Outcome,
    pub reason: String,
    /// Snapshot of the evaluated action, kept on policy verdict entries so
    /// decisions can be replayed against another rule set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl AuditEntry {
    pub fn new(
        batch_id: BatchId,
        action_index: usize,
        kind: impl Into<String>,
        decision: AuditDecision,
        outcome: Outcome,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            batch_id,
            action_index,
            kind: kind.into(),
            decision,
            rule_id: None,
            outcome,
            reason: reason.into(),
            action: None,
        }
    }

    pub fn with_rule(mut self, rule_id: Option<String>) -> Self {
        self.rule_id = rule_id;
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_kind_display_from_str() {
        for kind in ActionKind::ALL {
            let parsed: ActionKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("reboot".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_action_kind_serde_is_kebab_case() {
        let json = serde_json::to_string(&ActionKind::PackageInstall).unwrap();
        assert_eq!(json, "\"package-install\"");
    }

    #[test]
    fn test_from_value_well_formed() {
        let action = Action::from_value(json!({
            "kind": "package-install",
            "parameters": {"name": "curl"},
            "riskHint": "low"
        }));
        assert!(action.shape_error.is_none());
        assert_eq!(action.risk_hint, Some(RiskHint::Low));
        assert_eq!(
            action.operation().unwrap(),
            Operation::PackageInstall {
                name: "curl".to_string()
            }
        );
    }

    #[test]
    fn test_from_value_unknown_field_is_shape_error() {
        let action = Action::from_value(json!({
            "kind": "package-install",
            "parameters": {"name": "curl"},
            "sudo": true
        }));
        assert!(action.shape_error.as_deref().unwrap().contains("sudo"));
        assert!(action.operation().is_err());
    }

    #[test]
    fn test_from_value_missing_kind() {
        let action = Action::from_value(json!({"parameters": {}}));
        assert!(action.shape_error.as_deref().unwrap().contains("kind"));
    }

    #[test]
    fn test_from_value_non_object() {
        let action = Action::from_value(json!("restart nginx"));
        assert!(action.kind.is_empty());
        assert!(action.operation().is_err());
    }

    #[test]
    fn test_from_value_bad_risk_hint() {
        let action = Action::from_value(json!({
            "kind": "shell-command",
            "parameters": {"cmd": "ls"},
            "riskHint": "extreme"
        }));
        assert!(action.risk_hint.is_none());
        assert!(action.shape_error.is_some());
    }

    #[test]
    fn test_operation_rejects_unknown_kind() {
        let action = Action::from_value(json!({"kind": "reboot", "parameters": {}}));
        let err = action.operation().unwrap_err();
        assert!(err.to_string().contains("reboot"));
    }

    #[test]
    fn test_operation_rejects_missing_and_extra_parameters() {
        let missing = Action::from_value(json!({"kind": "service-restart", "parameters": {}}));
        assert!(missing.operation().is_err());

        let extra = Action::from_value(json!({
            "kind": "service-restart",
            "parameters": {"service": "nginx", "force": "yes"}
        }));
        assert!(extra.operation().is_err());
    }

    #[test]
    fn test_operation_rejects_non_string_parameter() {
        let action = Action::from_value(json!({
            "kind": "package-install",
            "parameters": {"name": 42}
        }));
        assert!(action.operation().is_err());
    }

    #[test]
    fn test_file_write_path_validation() {
        let relative = Action::new(ActionKind::FileWrite, &[("path", "etc/motd")]);
        assert!(relative.operation().is_err());

        let traversal = Action::new(ActionKind::FileWrite, &[("path", "/tmp/../etc/shadow")]);
        assert!(traversal.operation().is_err());

        let ok = Action::new(
            ActionKind::FileWrite,
            &[("path", "/etc/motd"), ("content", "hello")],
        );
        assert_eq!(
            ok.operation().unwrap(),
            Operation::FileWrite {
                path: "/etc/motd".to_string(),
                content: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_package_and_service_names() {
        assert!(is_valid_package_name("libssl3"));
        assert!(is_valid_package_name("g++"));
        assert!(!is_valid_package_name("curl; rm -rf /"));
        assert!(!is_valid_package_name("-curl"));
        assert!(is_valid_service_name("nginx"));
        assert!(is_valid_service_name("getty@tty1.service"));
        assert!(!is_valid_service_name("nginx && reboot"));
    }

    #[test]
    fn test_operation_parameter_lookup() {
        let op = Operation::ShellCommand {
            cmd: "ls -la".to_string(),
        };
        assert_eq!(op.parameter("cmd"), Some("ls -la"));
        assert_eq!(op.parameter("path"), None);
        assert_eq!(op.kind(), ActionKind::ShellCommand);
    }

    #[test]
    fn test_batch_from_planner_array() {
        let raw = r#"[
            {"kind": "package-install", "parameters": {"name": "curl"}},
            {"kind": "service-restart", "parameters": {"service": "nginx"}}
        ]"#;
        let batch = ActionBatch::from_planner_json(raw, ExecutionMode::BestEffort).unwrap();
        assert_eq!(batch.actions.len(), 2);
        assert_eq!(batch.mode, ExecutionMode::BestEffort);
    }

    #[test]
    fn test_batch_from_planner_object_with_mode() {
        let raw = r#"{"mode": "sequential", "actions": [{"kind": "shell-command"}]}"#;
        let batch = ActionBatch::from_planner_json(raw, ExecutionMode::BestEffort).unwrap();
        assert_eq!(batch.mode, ExecutionMode::Sequential);
        assert_eq!(batch.actions.len(), 1);
    }

    #[test]
    fn test_batch_from_planner_rejects_garbage() {
        assert!(ActionBatch::from_planner_json("not json", ExecutionMode::BestEffort).is_err());
        assert!(ActionBatch::from_planner_json("{}", ExecutionMode::BestEffort).is_err());
        assert!(ActionBatch::from_planner_json("42", ExecutionMode::BestEffort).is_err());
    }

    #[test]
    fn test_batch_ids_are_unique() {
        let a = ActionBatch::new(vec![], ExecutionMode::BestEffort);
        let b = ActionBatch::new(vec![], ExecutionMode::BestEffort);
        assert_ne!(a.batch_id, b.batch_id);
    }

    #[test]
    fn test_batch_id_from_str() {
        let id = BatchId::new();
        let parsed: BatchId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("nope".parse::<BatchId>().is_err());
    }

    #[test]
    fn test_pending_status_terminal() {
        assert!(!PendingStatus::Awaiting.is_terminal());
        assert!(PendingStatus::Approved.is_terminal());
        assert!(PendingStatus::Rejected.is_terminal());
        assert!(PendingStatus::Expired.is_terminal());
    }

    #[test]
    fn test_pending_record_resolution() {
        let mut record = PendingRecord {
            batch_id: BatchId::new(),
            created_at: Timestamp::now(),
            actions: vec![
                PendingAction {
                    action_index: 0,
                    action: Action::new(ActionKind::ServiceRestart, &[("service", "nginx")]),
                    rule_id: None,
                    reason: "no matching policy rule".to_string(),
                    status: PendingStatus::Awaiting,
                },
                PendingAction {
                    action_index: 3,
                    action: Action::new(ActionKind::ShellCommand, &[("cmd", "ls")]),
                    rule_id: None,
                    reason: "no matching policy rule".to_string(),
                    status: PendingStatus::Rejected,
                },
            ],
        };
        assert!(!record.is_resolved());
        assert_eq!(record.awaiting().count(), 1);
        assert!(record.action(3).is_some());
        assert!(record.action(1).is_none());

        record.actions[0].status = PendingStatus::Approved;
        assert!(record.is_resolved());
    }

    #[test]
    fn test_outcome_parts_round_trip() {
        let outcome = Outcome::Failure {
            error: "timeout".to_string(),
        };
        let rebuilt =
            Outcome::from_parts(outcome.label(), outcome.detail().map(str::to_string)).unwrap();
        assert_eq!(rebuilt, outcome);
        assert!(Outcome::from_parts("exploded", None).is_err());
        assert!(!Outcome::NotRun.is_execution());
    }

    #[test]
    fn test_audit_decision_permits_execution() {
        assert!(AuditDecision::Allow.permits_execution());
        assert!(AuditDecision::Approved.permits_execution());
        assert!(!AuditDecision::Confirm.permits_execution());
        assert!(!AuditDecision::Deny.permits_execution());
        assert_eq!(AuditDecision::from(Decision::Deny), AuditDecision::Deny);
    }

    #[test]
    fn test_timestamp_age() {
        let ts = Timestamp(Timestamp::now().0 - 120);
        assert!(ts.age_secs() >= 120);
        assert_eq!(Timestamp::from_datetime(ts.to_datetime()), ts);
    }
}
