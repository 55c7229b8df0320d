use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    gate::policy::PolicyConfig,
    types::{Confidence, IncidentId, RiskLevel, Severity, Stage},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    AutoExecute,
    RequireApproval,
    EscalateHuman,
    RejectLowConfidence,
}

impl DecisionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionOutcome::AutoExecute => "auto_execute",
            DecisionOutcome::RequireApproval => "require_approval",
            DecisionOutcome::EscalateHuman => "escalate_human",
            DecisionOutcome::RejectLowConfidence => "reject_low_confidence",
        }
    }
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rule that produced a decision. Reported with every terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRule {
    AuditWriteFailed,
    Timeout,
    Cancelled,
    NonActionableInput,
    StageFailed,
    EscalateToHuman,
    SeverityOverride,
    RiskCeiling,
    AutoExecute,
    RequireValidation,
    NoAutonomousPath,
}

impl PolicyRule {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyRule::AuditWriteFailed => "audit_write_failed",
            PolicyRule::Timeout => "timeout",
            PolicyRule::Cancelled => "cancelled",
            PolicyRule::NonActionableInput => "non_actionable_input",
            PolicyRule::StageFailed => "stage_failed",
            PolicyRule::EscalateToHuman => "escalate_to_human",
            PolicyRule::SeverityOverride => "severity_override",
            PolicyRule::RiskCeiling => "risk_ceiling",
            PolicyRule::AutoExecute => "auto_execute",
            PolicyRule::RequireValidation => "require_validation",
            PolicyRule::NoAutonomousPath => "no_autonomous_path",
        }
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: String,
    pub message: String,
}

/// Everything the decision rule looks at. Built by the orchestrator from
/// stage results, or reconstructed from audit records for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateInput {
    pub severity: Severity,
    pub plan_confidence: Option<Confidence>,
    pub plan_risk: Option<RiskLevel>,
    pub stage_failure: Option<StageFailure>,
    pub diagnosis_inconclusive: bool,
    pub non_actionable: bool,
    pub timed_out: bool,
    pub cancelled: bool,
    pub audit_failed: bool,
}

impl GateInput {
    pub fn new(severity: Severity) -> Self {
        Self {
            severity,
            plan_confidence: None,
            plan_risk: None,
            stage_failure: None,
            diagnosis_inconclusive: false,
            non_actionable: false,
            timed_out: false,
            cancelled: false,
            audit_failed: false,
        }
    }

    pub fn with_plan(mut self, confidence: Confidence, risk: RiskLevel) -> Self {
        self.plan_confidence = Some(confidence);
        self.plan_risk = Some(risk);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub outcome: DecisionOutcome,
    pub rule: PolicyRule,
}

impl GateVerdict {
    fn new(outcome: DecisionOutcome, rule: PolicyRule) -> Self {
        Self { outcome, rule }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationDecision {
    pub incident_id: IncidentId,
    pub outcome: DecisionOutcome,
    pub rule: PolicyRule,
    pub severity: Severity,
    pub confidence: Option<Confidence>,
    #[serde(with = "time::serde::rfc3339")]
    pub decided_at: OffsetDateTime,
}

/// Deterministic policy engine. Holds no external resource and never blocks.
#[derive(Debug, Clone)]
pub struct EscalationGate {
    policy: Arc<PolicyConfig>,
}

impl EscalationGate {
    pub fn new(policy: Arc<PolicyConfig>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Pure function of the input and the policy; rules are checked in order.
    pub fn evaluate(&self, input: &GateInput) -> GateVerdict {
        use DecisionOutcome::{AutoExecute, EscalateHuman, RejectLowConfidence, RequireApproval};

        if input.audit_failed {
            return GateVerdict::new(EscalateHuman, PolicyRule::AuditWriteFailed);
        }
        if input.timed_out {
            return GateVerdict::new(EscalateHuman, PolicyRule::Timeout);
        }
        if input.cancelled {
            return GateVerdict::new(EscalateHuman, PolicyRule::Cancelled);
        }
        if input.non_actionable && self.policy.reject_non_actionable {
            return GateVerdict::new(RejectLowConfidence, PolicyRule::NonActionableInput);
        }
        if input.stage_failure.is_some() {
            return GateVerdict::new(EscalateHuman, PolicyRule::StageFailed);
        }

        let tier = self.policy.tier(input.severity);
        let thresholds = tier.thresholds;
        let confidence = match input.plan_confidence {
            Some(confidence) if !input.diagnosis_inconclusive => confidence.value(),
            _ => return GateVerdict::new(EscalateHuman, PolicyRule::EscalateToHuman),
        };
        if confidence < thresholds.low {
            return GateVerdict::new(EscalateHuman, PolicyRule::EscalateToHuman);
        }

        if input.severity == Severity::Critical || tier.approval_required {
            return GateVerdict::new(RequireApproval, PolicyRule::SeverityOverride);
        }

        if confidence >= thresholds.high && tier.autonomous_execution {
            let risk = input.plan_risk.unwrap_or(RiskLevel::Critical);
            if risk > self.policy.autonomous_risk_ceiling {
                return GateVerdict::new(RequireApproval, PolicyRule::RiskCeiling);
            }
            return GateVerdict::new(AutoExecute, PolicyRule::AutoExecute);
        }

        if confidence >= thresholds.medium && confidence < thresholds.high {
            return GateVerdict::new(RequireApproval, PolicyRule::RequireValidation);
        }

        GateVerdict::new(EscalateHuman, PolicyRule::NoAutonomousPath)
    }

    pub fn decide(
        &self,
        incident_id: &str,
        input: &GateInput,
        decided_at: OffsetDateTime,
    ) -> EscalationDecision {
        let verdict = self.evaluate(input);
        tracing::info!(
            target: "gate",
            incident_id = incident_id,
            severity = input.severity.as_str(),
            plan_confidence = input.plan_confidence.map(Confidence::value),
            outcome = verdict.outcome.as_str(),
            rule = verdict.rule.as_str(),
            "decision_made"
        );
        EscalationDecision {
            incident_id: incident_id.to_string(),
            outcome: verdict.outcome,
            rule: verdict.rule,
            severity: input.severity,
            confidence: input.plan_confidence,
            decided_at,
        }
    }
}
