use healer::{
    gate::{DecisionOutcome, GateInput, PolicyConfig, PolicyRule, StageFailure},
    types::{RiskLevel, Severity, Stage},
};
use time::macros::datetime;

use super::{conf, default_gate, gate_with, planned};

#[test]
fn given_low_severity_and_high_confidence_when_evaluated_then_auto_executes() {
    let verdict = default_gate().evaluate(&planned(Severity::Low, 0.95, RiskLevel::Medium));
    assert_eq!(verdict.outcome, DecisionOutcome::AutoExecute);
    assert_eq!(verdict.rule, PolicyRule::AutoExecute);
}

#[test]
fn given_critical_severity_when_evaluated_at_any_confidence_then_never_auto_executes() {
    let gate = default_gate();
    for step in 0..=100 {
        let confidence = step as f64 / 100.0;
        for risk in [
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::Critical,
        ] {
            let verdict = gate.evaluate(&planned(Severity::Critical, confidence, risk));
            assert_ne!(
                verdict.outcome,
                DecisionOutcome::AutoExecute,
                "confidence {confidence} risk {risk:?}"
            );
        }
    }
}

#[test]
fn given_critical_severity_with_permissive_tier_when_evaluated_then_severity_override_still_applies() {
    let mut policy = PolicyConfig::default();
    let critical = policy.tier_settings_mut(Severity::Critical);
    critical.approval_required = Some(false);
    critical.autonomous_execution = Some(true);

    let verdict = gate_with(policy).evaluate(&planned(Severity::Critical, 0.99, RiskLevel::Low));
    assert_eq!(verdict.outcome, DecisionOutcome::RequireApproval);
    assert_eq!(verdict.rule, PolicyRule::SeverityOverride);
}

#[test]
fn given_confidence_in_medium_band_when_evaluated_then_requires_validation() {
    let verdict = default_gate().evaluate(&planned(Severity::Medium, 0.8, RiskLevel::Low));
    assert_eq!(verdict.outcome, DecisionOutcome::RequireApproval);
    assert_eq!(verdict.rule, PolicyRule::RequireValidation);
}

#[test]
fn given_confidence_below_low_threshold_when_evaluated_then_escalates_before_severity_override() {
    let verdict = default_gate().evaluate(&planned(Severity::Critical, 0.4, RiskLevel::Low));
    assert_eq!(verdict.outcome, DecisionOutcome::EscalateHuman);
    assert_eq!(verdict.rule, PolicyRule::EscalateToHuman);
}

#[test]
fn given_confidence_between_low_and_medium_when_evaluated_then_no_autonomous_path() {
    let verdict = default_gate().evaluate(&planned(Severity::Low, 0.6, RiskLevel::Low));
    assert_eq!(verdict.outcome, DecisionOutcome::EscalateHuman);
    assert_eq!(verdict.rule, PolicyRule::NoAutonomousPath);
}

#[test]
fn given_high_severity_when_evaluated_then_tier_requires_approval() {
    let verdict = default_gate().evaluate(&planned(Severity::High, 0.95, RiskLevel::Low));
    assert_eq!(verdict.outcome, DecisionOutcome::RequireApproval);
    assert_eq!(verdict.rule, PolicyRule::SeverityOverride);
}

#[test]
fn given_autonomy_disabled_for_tier_when_confidence_is_high_then_escalates() {
    let mut policy = PolicyConfig::default();
    policy.tier_settings_mut(Severity::Low).autonomous_execution = Some(false);

    let verdict = gate_with(policy).evaluate(&planned(Severity::Low, 0.95, RiskLevel::Low));
    assert_eq!(verdict.outcome, DecisionOutcome::EscalateHuman);
    assert_eq!(verdict.rule, PolicyRule::NoAutonomousPath);
}

#[test]
fn given_plan_risk_above_ceiling_when_confidence_is_high_then_requires_approval() {
    let verdict = default_gate().evaluate(&planned(Severity::Low, 0.95, RiskLevel::Critical));
    assert_eq!(verdict.outcome, DecisionOutcome::RequireApproval);
    assert_eq!(verdict.rule, PolicyRule::RiskCeiling);
}

#[test]
fn given_audit_failure_when_other_rules_also_apply_then_audit_failure_wins() {
    let mut input = planned(Severity::Low, 0.99, RiskLevel::Low);
    input.timed_out = true;
    input.cancelled = true;
    input.audit_failed = true;

    let verdict = default_gate().evaluate(&input);
    assert_eq!(verdict.outcome, DecisionOutcome::EscalateHuman);
    assert_eq!(verdict.rule, PolicyRule::AuditWriteFailed);
}

#[test]
fn given_timeout_when_plan_confidence_is_high_then_escalates_with_timeout_rule() {
    let mut input = planned(Severity::Low, 0.99, RiskLevel::Low);
    input.timed_out = true;

    let verdict = default_gate().evaluate(&input);
    assert_eq!(verdict.outcome, DecisionOutcome::EscalateHuman);
    assert_eq!(verdict.rule, PolicyRule::Timeout);
}

#[test]
fn given_stage_failure_when_evaluated_then_escalates_with_stage_failed_rule() {
    let mut input = GateInput::new(Severity::Medium);
    input.stage_failure = Some(StageFailure {
        stage: Stage::Classification,
        kind: "reasoning_timeout".to_string(),
        message: "classification failed".to_string(),
    });

    let verdict = default_gate().evaluate(&input);
    assert_eq!(verdict.outcome, DecisionOutcome::EscalateHuman);
    assert_eq!(verdict.rule, PolicyRule::StageFailed);
}

#[test]
fn given_inconclusive_diagnosis_when_evaluated_then_escalates_to_human() {
    let mut input = planned(Severity::Low, 0.95, RiskLevel::Low);
    input.diagnosis_inconclusive = true;

    let verdict = default_gate().evaluate(&input);
    assert_eq!(verdict.outcome, DecisionOutcome::EscalateHuman);
    assert_eq!(verdict.rule, PolicyRule::EscalateToHuman);
}

#[test]
fn given_non_actionable_input_when_rejection_enabled_then_rejects_low_confidence() {
    let mut input = GateInput::new(Severity::Medium);
    input.non_actionable = true;

    let mut policy = PolicyConfig::default();
    policy.reject_non_actionable = true;
    let verdict = gate_with(policy).evaluate(&input);
    assert_eq!(verdict.outcome, DecisionOutcome::RejectLowConfidence);
    assert_eq!(verdict.rule, PolicyRule::NonActionableInput);

    let verdict = default_gate().evaluate(&input);
    assert_eq!(verdict.outcome, DecisionOutcome::EscalateHuman);
    assert_ne!(verdict.rule, PolicyRule::NonActionableInput);
}

#[test]
fn given_same_input_when_decided_twice_then_decisions_match() {
    let gate = default_gate();
    let input = planned(Severity::Medium, 0.75, RiskLevel::High);
    let decided_at = datetime!(2026-05-04 09:30 UTC);

    let first = gate.decide("INC-42", &input, decided_at);
    let second = gate.decide("INC-42", &input, decided_at);
    assert_eq!(first, second);
    assert_eq!(first.confidence, Some(conf(0.75)));
    assert_eq!(first.severity, Severity::Medium);
}
