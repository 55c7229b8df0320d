use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::{
    gate::decision::{DecisionOutcome, PolicyRule},
    types::{Confidence, IncidentId, RiskLevel, Severity, Stage},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Completed,
    FallbackApplied,
    Failed,
    Inconclusive,
    TimedOut,
    Cancelled,
    Decided,
    Approved,
    Rejected,
    Acknowledged,
    HumanResponseTimeout,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Completed => "completed",
            AuditStatus::FallbackApplied => "fallback_applied",
            AuditStatus::Failed => "failed",
            AuditStatus::Inconclusive => "inconclusive",
            AuditStatus::TimedOut => "timed_out",
            AuditStatus::Cancelled => "cancelled",
            AuditStatus::Decided => "decided",
            AuditStatus::Approved => "approved",
            AuditStatus::Rejected => "rejected",
            AuditStatus::Acknowledged => "acknowledged",
            AuditStatus::HumanResponseTimeout => "human_response_timeout",
        }
    }
}

/// One immutable fact about an incident. `digest` covers every other field,
/// including `prev_digest`, so records of one incident form a hash chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub incident_id: IncidentId,
    pub seq_no: u64,
    pub stage: Stage,
    pub status: AuditStatus,
    pub input_summary: String,
    pub output_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<PolicyRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub non_actionable: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_digest: Option<String>,
    #[serde(default)]
    pub digest: String,
}

impl AuditRecord {
    pub fn compute_digest(&self) -> String {
        let mut unsigned = self.clone();
        unsigned.digest = String::new();
        let canonical = serde_json::to_value(&unsigned)
            .map(|value| value.to_string())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let digest = hasher.finalize();
        format!("{:x}", digest)
    }
}

/// Stage-supplied content of a record; sequencing and hashing are added by the trail.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub stage: Stage,
    pub status: AuditStatus,
    pub input_summary: String,
    pub output_summary: String,
    pub confidence: Option<Confidence>,
    pub severity: Option<Severity>,
    pub risk: Option<RiskLevel>,
    pub decision: Option<DecisionOutcome>,
    pub rule: Option<PolicyRule>,
    pub failure: Option<String>,
    pub attempts: u32,
    pub non_actionable: bool,
}

impl AuditEntry {
    pub fn new(stage: Stage, status: AuditStatus) -> Self {
        Self {
            stage,
            status,
            input_summary: String::new(),
            output_summary: String::new(),
            confidence: None,
            severity: None,
            risk: None,
            decision: None,
            rule: None,
            failure: None,
            attempts: 0,
            non_actionable: false,
        }
    }

    pub fn input(mut self, summary: impl Into<String>) -> Self {
        self.input_summary = summary.into();
        self
    }

    pub fn output(mut self, summary: impl Into<String>) -> Self {
        self.output_summary = summary.into();
        self
    }

    pub fn confidence(mut self, confidence: Option<Confidence>) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn severity(mut self, severity: Option<Severity>) -> Self {
        self.severity = severity;
        self
    }

    pub fn risk(mut self, risk: Option<RiskLevel>) -> Self {
        self.risk = risk;
        self
    }

    pub fn decision(mut self, outcome: DecisionOutcome, rule: PolicyRule) -> Self {
        self.decision = Some(outcome);
        self.rule = Some(rule);
        self
    }

    pub fn failure(mut self, kind: impl Into<String>) -> Self {
        self.failure = Some(kind.into());
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn non_actionable(mut self, non_actionable: bool) -> Self {
        self.non_actionable = non_actionable;
        self
    }

    pub fn seal(
        self,
        incident_id: &str,
        seq_no: u64,
        prev_digest: Option<String>,
        recorded_at: OffsetDateTime,
    ) -> AuditRecord {
        let mut record = AuditRecord {
            incident_id: incident_id.to_string(),
            seq_no,
            stage: self.stage,
            status: self.status,
            input_summary: self.input_summary,
            output_summary: self.output_summary,
            confidence: self.confidence,
            severity: self.severity,
            risk: self.risk,
            decision: self.decision,
            rule: self.rule,
            failure: self.failure,
            attempts: self.attempts,
            non_actionable: self.non_actionable,
            recorded_at,
            prev_digest,
            digest: String::new(),
        };
        record.digest = record.compute_digest();
        record
    }
}
