use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub type IncidentId = String;

/// Probability-like score attached to every probabilistic output.
///
/// Construction rejects NaN and values outside `[0, 1]`, so holding a
/// `Confidence` means the value has already passed the boundary check.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceOutOfRange(pub f64);

impl fmt::Display for ConfidenceOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "confidence {} is outside [0, 1]", self.0)
    }
}

impl std::error::Error for ConfidenceOutOfRange {}

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const CERTAIN: Confidence = Confidence(1.0);

    pub fn new(value: f64) -> Result<Self, ConfidenceOutOfRange> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(ConfidenceOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn min(self, other: Confidence) -> Confidence {
        if other.0 < self.0 { other } else { self }
    }

    pub fn max(self, other: Confidence) -> Confidence {
        if other.0 > self.0 { other } else { self }
    }

    /// Product of two scores. Never exceeds either operand.
    pub fn scaled_by(self, other: Confidence) -> Confidence {
        Confidence(self.0 * other.0)
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ConfidenceOutOfRange;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Confidence::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cpu,
    Memory,
    Disk,
    Network,
    DatabasePerformance,
    ApplicationPerformance,
    Security,
    BackupFailure,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Cpu,
        Category::Memory,
        Category::Disk,
        Category::Network,
        Category::DatabasePerformance,
        Category::ApplicationPerformance,
        Category::Security,
        Category::BackupFailure,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Cpu => "cpu",
            Category::Memory => "memory",
            Category::Disk => "disk",
            Category::Network => "network",
            Category::DatabasePerformance => "database_performance",
            Category::ApplicationPerformance => "application_performance",
            Category::Security => "security",
            Category::BackupFailure => "backup_failure",
            Category::Other => "other",
        }
    }

    /// Accepts canonical names and the monitoring-style aliases seen on the wire
    /// (`cpu_utilization`, `network_connectivity`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let category = match normalized.as_str() {
            "cpu" | "cpu_utilization" => Category::Cpu,
            "memory" | "memory_utilization" => Category::Memory,
            "disk" | "disk_utilization" | "storage" => Category::Disk,
            "network" | "network_connectivity" => Category::Network,
            "database_performance" | "database" => Category::DatabasePerformance,
            "application_performance" | "application" => Category::ApplicationPerformance,
            "security" | "security_incident" => Category::Security,
            "backup_failure" | "backup" => Category::BackupFailure,
            "other" => Category::Other,
            _ => return None,
        };
        Some(category)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn escalated(self) -> Self {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium => RiskLevel::High,
            RiskLevel::High | RiskLevel::Critical => RiskLevel::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Named step of an incident's lifecycle, as recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intake,
    Classification,
    Diagnosis,
    Planning,
    Gate,
    Execution,
    Approval,
    Escalation,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Intake => "intake",
            Stage::Classification => "classification",
            Stage::Diagnosis => "diagnosis",
            Stage::Planning => "planning",
            Stage::Gate => "gate",
            Stage::Execution => "execution",
            Stage::Approval => "approval",
            Stage::Escalation => "escalation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Received,
    Classified,
    Diagnosed,
    Planned,
    Executed,
    PendingApproval,
    Escalated,
    Rejected,
}

impl IncidentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            IncidentStatus::Executed
                | IncidentStatus::PendingApproval
                | IncidentStatus::Escalated
                | IncidentStatus::Rejected
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessImpact {
    pub criticality: Criticality,
    pub sla_target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_users: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub description: String,
    pub category: Category,
    pub severity: Severity,
    pub affected_systems: BTreeSet<String>,
    pub symptoms: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub business_impact: BusinessImpact,
    pub status: IncidentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
}

impl Incident {
    pub fn systems_label(&self) -> String {
        if self.affected_systems.is_empty() {
            return "-".to_string();
        }
        self.affected_systems
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(",")
    }
}
