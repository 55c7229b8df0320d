use time::OffsetDateTime;

use crate::{
    orchestrator::error::{OrchestratorError, invalid_transition},
    types::{IncidentId, IncidentStatus},
};

/// Lifecycle of one incident. Owned by the task processing it and never shared.
#[derive(Debug, Clone)]
pub struct IncidentState {
    incident_id: IncidentId,
    status: IncidentStatus,
    transitions: Vec<(IncidentStatus, OffsetDateTime)>,
}

impl IncidentState {
    pub fn new(incident_id: impl Into<IncidentId>, received_at: OffsetDateTime) -> Self {
        Self {
            incident_id: incident_id.into(),
            status: IncidentStatus::Received,
            transitions: vec![(IncidentStatus::Received, received_at)],
        }
    }

    pub fn incident_id(&self) -> &str {
        &self.incident_id
    }

    pub fn status(&self) -> IncidentStatus {
        self.status
    }

    pub fn transitions(&self) -> &[(IncidentStatus, OffsetDateTime)] {
        &self.transitions
    }

    pub fn advance(&mut self, next: IncidentStatus) -> Result<(), OrchestratorError> {
        if !is_allowed(self.status, next) {
            return Err(invalid_transition(format!(
                "incident {} cannot move from {:?} to {:?}",
                self.incident_id, self.status, next
            )));
        }
        self.status = next;
        self.transitions.push((next, OffsetDateTime::now_utc()));
        Ok(())
    }
}

fn is_allowed(from: IncidentStatus, to: IncidentStatus) -> bool {
    use IncidentStatus::*;

    match (from, to) {
        (Received, Classified) | (Classified, Diagnosed) | (Diagnosed, Planned) => true,
        (Planned, Executed | PendingApproval) => true,
        // An approved plan is executed; a failed execution ends escalated.
        (PendingApproval, Executed | Rejected | Escalated) => true,
        (from, Escalated | Rejected) => !from.is_terminal(),
        _ => false,
    }
}
