//! Policy rules, constraints, and the TOML rule-set loader.
//!
//! A rule set is an ordered list of rules. Declaration order matters: when
//! two matching rules are equally specific, the earlier one wins.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use warden_core::types::{ActionKind, Decision, Operation};

use crate::error::PolicyError;

// =============================================================================
// File format
// =============================================================================

/// On-disk rule set: a list of `[[rules]]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSetFile {
    #[serde(default)]
    pub rules: Vec<RuleDef>,
}

/// One rule as written in the policy file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    pub id: String,
    /// Restrict the rule to one action kind. Omitted means any kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ActionKind>,
    pub decision: Decision,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub constraints: Vec<ConstraintDef>,
}

/// Parameter constraint as written in the policy file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintDef {
    /// Parameter is a path at or below one of the prefixes.
    PathPrefix { param: String, prefixes: Vec<String> },
    /// Parameter equals one of the values.
    OneOf { param: String, values: Vec<String> },
    /// Parameter matches the regular expression.
    Pattern { param: String, regex: String },
    /// First word of the parameter (or its basename) is one of the programs.
    Program { param: String, programs: Vec<String> },
}

// =============================================================================
// Compiled rules
// =============================================================================

/// Compiled parameter constraint.
#[derive(Debug, Clone)]
pub enum Constraint {
    PathPrefix { param: String, prefixes: Vec<String> },
    OneOf { param: String, values: Vec<String> },
    Pattern { param: String, regex: Regex },
    Program { param: String, programs: Vec<String> },
}

impl Constraint {
    fn compile(rule_id: &str, def: ConstraintDef) -> Result<Self, PolicyError> {
        let constraint = match def {
            ConstraintDef::PathPrefix { param, prefixes } => {
                if let Some(bad) = prefixes.iter().find(|p| !p.starts_with('/')) {
                    return Err(PolicyError::InvalidRule {
                        rule_id: rule_id.to_string(),
                        message: format!("path prefix '{}' is not absolute", bad),
                    });
                }
                Constraint::PathPrefix { param, prefixes }
            }
            ConstraintDef::OneOf { param, values } => Constraint::OneOf { param, values },
            ConstraintDef::Pattern { param, regex } => {
                let regex = Regex::new(&regex).map_err(|source| PolicyError::InvalidPattern {
                    rule_id: rule_id.to_string(),
                    source,
                })?;
                Constraint::Pattern { param, regex }
            }
            ConstraintDef::Program { param, programs } => Constraint::Program { param, programs },
        };

        if constraint.param().is_empty() {
            return Err(PolicyError::InvalidRule {
                rule_id: rule_id.to_string(),
                message: "constraint has an empty parameter name".to_string(),
            });
        }
        Ok(constraint)
    }

    pub fn param(&self) -> &str {
        match self {
            Constraint::PathPrefix { param, .. }
            | Constraint::OneOf { param, .. }
            | Constraint::Pattern { param, .. }
            | Constraint::Program { param, .. } => param,
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Constraint::PathPrefix { prefixes, .. } => {
                let candidate = Path::new(value);
                prefixes.iter().any(|p| candidate.starts_with(p))
            }
            Constraint::OneOf { values, .. } => values.iter().any(|v| v == value),
            Constraint::Pattern { regex, .. } => regex.is_match(value),
            Constraint::Program { programs, .. } => {
                let Some(first) = value.split_whitespace().next() else {
                    return false;
                };
                let base = first.rsplit('/').next().unwrap_or(first);
                programs.iter().any(|p| p == first || p == base)
            }
        }
    }
}

/// A compiled policy rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub kind: Option<ActionKind>,
    pub decision: Decision,
    pub reason: String,
    pub constraints: Vec<Constraint>,
}

/// A rule names a parameter its kind does not define.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rule {rule_id}: {kind} actions have no parameter `{param}`")]
pub struct EvaluationFault {
    pub rule_id: String,
    pub kind: ActionKind,
    pub param: String,
}

impl Rule {
    /// Kind scope counts 1, each constraint counts 1.
    pub fn specificity(&self) -> usize {
        usize::from(self.kind.is_some()) + self.constraints.len()
    }

    /// Structural match against a validated operation.
    pub fn matches(&self, op: &Operation) -> Result<bool, EvaluationFault> {
        if let Some(kind) = self.kind {
            if kind != op.kind() {
                return Ok(false);
            }
        }

        for constraint in &self.constraints {
            let value = match op.parameter(constraint.param()) {
                Some(value) => value,
                None => match self.kind {
                    Some(kind) => {
                        return Err(EvaluationFault {
                            rule_id: self.id.clone(),
                            kind,
                            param: constraint.param().to_string(),
                        })
                    }
                    None => return Ok(false),
                },
            };
            if !constraint.matches(value) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// =============================================================================
// Rule set
// =============================================================================

/// Immutable, validated rule set.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compile and validate rule definitions, preserving their order.
    pub fn new(defs: Vec<RuleDef>) -> Result<Self, PolicyError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(defs.len());

        for def in defs {
            if def.id.trim().is_empty() {
                return Err(PolicyError::InvalidRule {
                    rule_id: def.id,
                    message: "rule id must not be empty".to_string(),
                });
            }
            if !seen.insert(def.id.clone()) {
                return Err(PolicyError::DuplicateRuleId(def.id));
            }

            let constraints = def
                .constraints
                .into_iter()
                .map(|c| Constraint::compile(&def.id, c))
                .collect::<Result<Vec<_>, _>>()?;

            let reason = if def.reason.is_empty() {
                format!("matched rule {}", def.id)
            } else {
                def.reason
            };

            rules.push(Rule {
                id: def.id,
                kind: def.kind,
                decision: def.decision,
                reason,
                constraints,
            });
        }

        Ok(Self { rules })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, PolicyError> {
        let file: RuleSetFile =
            toml::from_str(raw).map_err(|e| PolicyError::Load(e.to_string()))?;
        Self::new(file.rules)
    }

    /// Load a rule set from a TOML file.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PolicyError::Load(format!("{}: {}", path.display(), e)))?;
        let set = Self::from_toml_str(&raw)?;
        info!(path = %path.display(), rules = set.len(), "Policy rule set loaded");
        Ok(set)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Kind-scoped constraints naming parameters the kind does not define.
    /// Such rules still load but force CONFIRM whenever they are consulted.
    pub fn lint(&self) -> Vec<EvaluationFault> {
        let mut faults = Vec::new();
        for rule in &self.rules {
            let Some(kind) = rule.kind else { continue };
            for constraint in &rule.constraints {
                if !kind.parameter_names().contains(&constraint.param()) {
                    faults.push(EvaluationFault {
                        rule_id: rule.id.clone(),
                        kind,
                        param: constraint.param().to_string(),
                    });
                }
            }
        }
        faults
    }
}
