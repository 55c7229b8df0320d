pub mod error;
pub mod hints;
pub mod report;

pub use error::{IntakeError, IntakeErrorKind};
pub use report::{IncidentDraft, IncidentReport, StructuredReport};
