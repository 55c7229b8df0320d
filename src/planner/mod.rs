pub mod catalog;
pub mod error;
pub mod planner;
pub mod types;

pub use error::{PlanningError, PlanningErrorKind};
pub use planner::{ActionDraft, PlanDraft, PlanVerdict, ResponsePlanner, assemble};
pub use types::{PlanSource, RemediationAction, RemediationPlan};
