use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{orchestrator::error::OrchestratorError, planner::RemediationPlan, types::Incident};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ExecutionResult {
    Success,
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalResult {
    Approved,
    Rejected,
    TimedOut,
}

/// Runs remediation. Invoked only after the gate allowed execution.
#[async_trait]
pub trait ExecutionPort: Send + Sync {
    async fn execute(&self, plan: &RemediationPlan) -> ExecutionResult;
}

#[async_trait]
pub trait ApprovalPort: Send + Sync {
    async fn request(
        &self,
        incident: &Incident,
        plan: &RemediationPlan,
        deadline: OffsetDateTime,
    ) -> ApprovalResult;
}

/// `Ok(())` is the acknowledgement.
#[async_trait]
pub trait EscalationNotifierPort: Send + Sync {
    async fn notify(&self, incident: &Incident, reason: &str) -> Result<(), OrchestratorError>;
}
