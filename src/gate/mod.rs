pub mod deadline;
pub mod decision;
pub mod error;
pub mod policy;
pub mod replay;

pub use decision::{
    DecisionOutcome, EscalationDecision, EscalationGate, GateInput, GateVerdict, PolicyRule,
    StageFailure,
};
pub use error::PolicyConfigInvalid;
pub use policy::{ConfidenceCombination, ConfidenceThresholds, PolicyConfig, SeverityTier};
