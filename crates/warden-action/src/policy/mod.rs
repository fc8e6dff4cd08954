//! Policy evaluation.
//!
//! `evaluate` is a pure function of an action and a rule set: no I/O, no
//! clock, no shared state. The most specific matching rule wins, ties go to
//! the first-declared rule, and anything unmatched or unparseable needs
//! operator confirmation.

pub mod rules;

pub use rules::{Constraint, ConstraintDef, EvaluationFault, Rule, RuleDef, RuleSet, RuleSetFile};

use tracing::warn;

use warden_core::types::{Action, Decision, Verdict};

/// Reason attached to CONFIRM verdicts when no rule matched.
pub const NO_MATCH_REASON: &str = "no matching policy rule";

/// Classify one action against a rule set.
pub fn evaluate(action: &Action, rule_set: &RuleSet) -> Verdict {
    let op = match action.operation() {
        Ok(op) => op,
        Err(malformed) => return Verdict::new(Decision::Confirm, None, malformed.to_string()),
    };

    let mut best: Option<(&Rule, usize)> = None;
    let mut best_deny: Option<(&Rule, usize)> = None;
    let mut fault: Option<(EvaluationFault, usize)> = None;
    for rule in rule_set.rules() {
        let score = rule.specificity();
        match rule.matches(&op) {
            Ok(true) => {
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((rule, score));
                }
                if rule.decision == Decision::Deny
                    && best_deny.map_or(true, |(_, top)| score > top)
                {
                    best_deny = Some((rule, score));
                }
            }
            Ok(false) => {}
            Err(err) => {
                warn!(
                    rule_id = %err.rule_id,
                    kind = %err.kind,
                    param = %err.param,
                    "Policy rule could not be evaluated"
                );
                if fault.as_ref().map_or(true, |(_, top)| score > *top) {
                    fault = Some((err, score));
                }
            }
        }
    }

    // A faulting rule cannot weaken a DENY at least as specific as it.
    if let Some((err, fault_score)) = fault {
        return match best_deny {
            Some((rule, score)) if score >= fault_score => {
                Verdict::new(rule.decision, Some(rule.id.clone()), rule.reason.clone())
            }
            _ => Verdict::new(
                Decision::Confirm,
                Some(err.rule_id.clone()),
                format!("policy evaluation error: {}", err),
            ),
        };
    }

    match best {
        Some((rule, _)) => Verdict::new(rule.decision, Some(rule.id.clone()), rule.reason.clone()),
        None => Verdict::new(Decision::Confirm, None, NO_MATCH_REASON),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::types::ActionKind;

    fn rule_set() -> RuleSet {
        RuleSet::from_toml_str(
            r#"
            [[rules]]
            id = "allow-packages"
            kind = "package-install"
            decision = "allow"
            reason = "package installs are allowed"

            [[rules]]
            id = "confirm-shell"
            kind = "shell-command"
            decision = "confirm"
            reason = "shell commands need confirmation"

            [[rules]]
            id = "deny-rm-root"
            kind = "shell-command"
            decision = "deny"
            reason = "recursive delete of /"
            constraints = [{ type = "pattern", param = "cmd", regex = '^rm\s+-[a-zA-Z]*r[a-zA-Z]*\s+/\s*$' }]

            [[rules]]
            id = "allow-safe-shell"
            kind = "shell-command"
            decision = "allow"
            constraints = [{ type = "program", param = "cmd", programs = ["uptime", "df"] }]

            [[rules]]
            id = "deny-etc-writes"
            decision = "deny"
            reason = "no writes under /etc"
            constraints = [{ type = "path_prefix", param = "path", prefixes = ["/etc"] }]

            [[rules]]
            id = "allow-motd"
            kind = "file-write"
            decision = "allow"
            reason = "motd is managed"
            constraints = [{ type = "one_of", param = "path", values = ["/etc/motd"] }]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_package_install_allowed() {
        let action = Action::new(ActionKind::PackageInstall, &[("name", "curl")]);
        let verdict = evaluate(&action, &rule_set());
        assert_eq!(verdict.decision, Decision::Allow);
        assert_eq!(verdict.rule_id.as_deref(), Some("allow-packages"));
    }

    #[test]
    fn test_rm_root_denied() {
        let action = Action::new(ActionKind::ShellCommand, &[("cmd", "rm -rf /")]);
        let verdict = evaluate(&action, &rule_set());
        assert_eq!(verdict.decision, Decision::Deny);
        assert_eq!(verdict.rule_id.as_deref(), Some("deny-rm-root"));
    }

    #[test]
    fn test_more_specific_rule_wins_over_kind_rule() {
        let action = Action::new(ActionKind::ShellCommand, &[("cmd", "df -h")]);
        let verdict = evaluate(&action, &rule_set());
        assert_eq!(verdict.decision, Decision::Allow);
        assert_eq!(verdict.rule_id.as_deref(), Some("allow-safe-shell"));

        let other = Action::new(ActionKind::ShellCommand, &[("cmd", "reboot")]);
        assert_eq!(
            evaluate(&other, &rule_set()).rule_id.as_deref(),
            Some("confirm-shell")
        );
    }

    #[test]
    fn test_tie_goes_to_first_declared() {
        // deny-etc-writes (wildcard + 1 constraint) and allow-motd
        // (kind + 1 constraint) differ in specificity, so allow-motd wins.
        let motd = Action::new(
            ActionKind::FileWrite,
            &[("path", "/etc/motd"), ("content", "hi")],
        );
        assert_eq!(
            evaluate(&motd, &rule_set()).rule_id.as_deref(),
            Some("allow-motd")
        );

        let tied = RuleSet::from_toml_str(
            r#"
            [[rules]]
            id = "first"
            kind = "service-restart"
            decision = "deny"
            [[rules]]
            id = "second"
            kind = "service-restart"
            decision = "allow"
            "#,
        )
        .unwrap();
        let action = Action::new(ActionKind::ServiceRestart, &[("service", "nginx")]);
        let verdict = evaluate(&action, &tied);
        assert_eq!(verdict.rule_id.as_deref(), Some("first"));
        assert_eq!(verdict.decision, Decision::Deny);
    }

    #[test]
    fn test_wildcard_rule_applies_across_kinds() {
        let action = Action::new(
            ActionKind::FileWrite,
            &[("path", "/etc/shadow"), ("content", "")],
        );
        let verdict = evaluate(&action, &rule_set());
        assert_eq!(verdict.decision, Decision::Deny);
        assert_eq!(verdict.rule_id.as_deref(), Some("deny-etc-writes"));
    }

    #[test]
    fn test_no_match_is_confirm() {
        let action = Action::new(ActionKind::ServiceRestart, &[("service", "nginx")]);
        let verdict = evaluate(&action, &rule_set());
        assert_eq!(verdict.decision, Decision::Confirm);
        assert_eq!(verdict.rule_id, None);
        assert_eq!(verdict.reason, NO_MATCH_REASON);
    }

    #[test]
    fn test_empty_rule_set_confirms_everything() {
        let empty = RuleSet::default();
        for kind in ActionKind::ALL {
            let params: Vec<(&str, &str)> = kind
                .parameter_names()
                .iter()
                .map(|p| (*p, if *p == "path" { "/tmp/x" } else { "x" }))
                .collect();
            let action = Action::new(kind, &params);
            assert_eq!(evaluate(&action, &empty).decision, Decision::Confirm);
        }
    }

    #[test]
    fn test_malformed_action_is_confirm() {
        let action = Action::from_value(json!({
            "kind": "package-install",
            "parameters": {"name": "curl; rm -rf /"}
        }));
        let verdict = evaluate(&action, &rule_set());
        assert_eq!(verdict.decision, Decision::Confirm);
        assert!(verdict.reason.starts_with("unparseable action"));

        let unknown = Action::from_value(json!({"kind": "reboot"}));
        assert_eq!(evaluate(&unknown, &rule_set()).decision, Decision::Confirm);
    }

    #[test]
    fn test_evaluation_fault_is_confirm() {
        let faulty = RuleSet::from_toml_str(
            r#"
            [[rules]]
            id = "allow-nginx"
            kind = "service-restart"
            decision = "allow"
            constraints = [{ type = "one_of", param = "unit", values = ["nginx"] }]
            "#,
        )
        .unwrap();
        let action = Action::new(ActionKind::ServiceRestart, &[("service", "nginx")]);
        let verdict = evaluate(&action, &faulty);
        assert_eq!(verdict.decision, Decision::Confirm);
        assert_eq!(verdict.rule_id.as_deref(), Some("allow-nginx"));
        assert!(verdict.reason.contains("policy evaluation error"));
    }

    #[test]
    fn test_fault_does_not_mask_more_specific_deny() {
        let rules = RuleSet::from_toml_str(
            r#"
            [[rules]]
            id = "allow-admin-shell"
            kind = "shell-command"
            decision = "allow"
            constraints = [{ type = "one_of", param = "command", values = ["uptime"] }]

            [[rules]]
            id = "deny-rm-root"
            kind = "shell-command"
            decision = "deny"
            reason = "recursive delete of /"
            constraints = [
                { type = "program", param = "cmd", programs = ["rm"] },
                { type = "pattern", param = "cmd", regex = '\s/\s*$' },
            ]
            "#,
        )
        .unwrap();

        let rm = Action::new(ActionKind::ShellCommand, &[("cmd", "rm -rf /")]);
        let verdict = evaluate(&rm, &rules);
        assert_eq!(verdict.decision, Decision::Deny);
        assert_eq!(verdict.rule_id.as_deref(), Some("deny-rm-root"));

        // Nothing denies `ls`, so the fault still forces confirmation.
        let ls = Action::new(ActionKind::ShellCommand, &[("cmd", "ls")]);
        let verdict = evaluate(&ls, &rules);
        assert_eq!(verdict.decision, Decision::Confirm);
        assert_eq!(verdict.rule_id.as_deref(), Some("allow-admin-shell"));
    }

    #[test]
    fn test_fault_outranks_less_specific_deny() {
        let rules = RuleSet::from_toml_str(
            r#"
            [[rules]]
            id = "deny-restarts"
            kind = "service-restart"
            decision = "deny"

            [[rules]]
            id = "allow-nginx"
            kind = "service-restart"
            decision = "allow"
            constraints = [{ type = "one_of", param = "unit", values = ["nginx"] }]
            "#,
        )
        .unwrap();
        let action = Action::new(ActionKind::ServiceRestart, &[("service", "nginx")]);
        let verdict = evaluate(&action, &rules);
        assert_eq!(verdict.decision, Decision::Confirm);
        assert_eq!(verdict.rule_id.as_deref(), Some("allow-nginx"));
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let rules = rule_set();
        let actions = [
            Action::new(ActionKind::PackageInstall, &[("name", "curl")]),
            Action::new(ActionKind::ShellCommand, &[("cmd", "rm -rf /")]),
            Action::new(ActionKind::ServiceRestart, &[("service", "nginx")]),
            Action::from_value(json!({"kind": 7})),
        ];
        for action in &actions {
            let first = evaluate(action, &rules);
            for _ in 0..10 {
                assert_eq!(evaluate(action, &rules), first);
            }
        }
    }

    #[test]
    fn test_risk_hint_does_not_affect_verdict() {
        let mut action = Action::new(ActionKind::PackageInstall, &[("name", "curl")]);
        let baseline = evaluate(&action, &rule_set());
        action.risk_hint = Some(warden_core::types::RiskHint::High);
        assert_eq!(evaluate(&action, &rule_set()), baseline);
    }
}
