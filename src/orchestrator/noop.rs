use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    orchestrator::{
        error::OrchestratorError,
        ports::{ApprovalPort, ApprovalResult, EscalationNotifierPort, ExecutionPort, ExecutionResult},
    },
    planner::RemediationPlan,
    types::Incident,
};

/// Records the plan in the log and reports success. Remediation actions are
/// opaque named operations; a real executor plugs in behind `ExecutionPort`.
#[derive(Debug, Clone, Default)]
pub struct LoggingExecutor;

#[async_trait]
impl ExecutionPort for LoggingExecutor {
    async fn execute(&self, plan: &RemediationPlan) -> ExecutionResult {
        tracing::info!(
            target: "orchestrator",
            primary = %plan.primary.name,
            risk = plan.risk.as_str(),
            fallbacks = ?plan.action_names(),
            "remediation_dispatched"
        );
        ExecutionResult::Success
    }
}

/// No approver is attached; every request runs into its deadline.
#[derive(Debug, Clone, Default)]
pub struct UnattendedApproval;

#[async_trait]
impl ApprovalPort for UnattendedApproval {
    async fn request(
        &self,
        _incident: &Incident,
        _plan: &RemediationPlan,
        _deadline: OffsetDateTime,
    ) -> ApprovalResult {
        ApprovalResult::TimedOut
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl EscalationNotifierPort for LoggingNotifier {
    async fn notify(&self, incident: &Incident, reason: &str) -> Result<(), OrchestratorError> {
        tracing::warn!(
            target: "orchestrator",
            incident_id = %incident.id,
            severity = incident.severity.as_str(),
            category = incident.category.as_str(),
            systems = %incident.systems_label(),
            reason = reason,
            "escalation_notified"
        );
        Ok(())
    }
}
