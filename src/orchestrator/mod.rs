pub mod engine;
pub mod error;
pub mod noop;
pub mod orchestrator;
pub mod ports;
pub mod state;

pub use engine::IncidentEngine;
pub use error::{OrchestratorError, OrchestratorErrorKind};
pub use noop::{LoggingExecutor, LoggingNotifier, UnattendedApproval};
pub use orchestrator::{Collaborators, IncidentOutcome, Orchestrator};
pub use ports::{
    ApprovalPort, ApprovalResult, EscalationNotifierPort, ExecutionPort, ExecutionResult,
};
pub use state::IncidentState;
