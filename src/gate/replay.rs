use crate::{
    audit::record::{AuditRecord, AuditStatus},
    gate::decision::{EscalationGate, GateInput, GateVerdict, PolicyRule, StageFailure},
    types::{Severity, Stage},
};

/// Rebuilds the gate input from the records written before the gate decision.
///
/// Returns `None` for an incident with no records.
pub fn reconstruct_input(records: &[AuditRecord]) -> Option<GateInput> {
    if records.is_empty() {
        return None;
    }

    let decision_record = records.iter().find(|record| record.stage == Stage::Gate);
    let cutoff = decision_record.map_or(u64::MAX, |record| record.seq_no);
    let before_gate = records.iter().filter(|record| record.seq_no < cutoff);

    let mut severity = None;
    let mut input = GateInput::new(Severity::Medium);
    for record in before_gate {
        match (record.stage, record.status) {
            (Stage::Intake, _) => {
                input.non_actionable = record.non_actionable;
                if severity.is_none() {
                    severity = record.severity;
                }
            }
            (Stage::Classification, AuditStatus::Completed | AuditStatus::FallbackApplied) => {
                if record.severity.is_some() {
                    severity = record.severity;
                }
            }
            (Stage::Diagnosis, AuditStatus::Inconclusive) => {
                input.diagnosis_inconclusive = true;
            }
            (Stage::Planning, AuditStatus::Completed | AuditStatus::FallbackApplied) => {
                input.plan_confidence = record.confidence;
                input.plan_risk = record.risk;
            }
            (
                stage @ (Stage::Classification | Stage::Diagnosis | Stage::Planning),
                AuditStatus::Failed,
            ) => {
                input.stage_failure = Some(StageFailure {
                    stage,
                    kind: record.failure.clone().unwrap_or_default(),
                    message: record.output_summary.clone(),
                });
            }
            (_, AuditStatus::TimedOut) => input.timed_out = true,
            (_, AuditStatus::Cancelled) => input.cancelled = true,
            _ => {}
        }
    }
    input.severity = severity.unwrap_or(Severity::Medium);
    input.audit_failed =
        decision_record.is_some_and(|record| record.rule == Some(PolicyRule::AuditWriteFailed));

    Some(input)
}

pub fn replay_decision(gate: &EscalationGate, records: &[AuditRecord]) -> Option<GateVerdict> {
    reconstruct_input(records).map(|input| gate.evaluate(&input))
}

/// The verdict written by the gate record, if the incident reached the gate.
pub fn recorded_verdict(records: &[AuditRecord]) -> Option<GateVerdict> {
    records
        .iter()
        .find(|record| record.stage == Stage::Gate)
        .and_then(|record| match (record.decision, record.rule) {
            (Some(outcome), Some(rule)) => Some(GateVerdict { outcome, rule }),
            _ => None,
        })
}
