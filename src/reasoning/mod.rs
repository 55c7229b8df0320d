pub mod adapters;
pub mod credentials;
pub mod error;
pub mod noop;
pub mod ports;
pub mod retry;
pub mod schema;
pub mod testing;
pub mod types;

pub use error::{ReasoningError, ReasoningErrorKind};
pub use ports::ReasoningPort;
pub use retry::{BoundedReasoner, ReasoningQuery, RetryPolicy, StageBudget};
pub use types::{
    ReasoningConfig, ReasoningOutcome, ReasoningRequest, ReasoningResponse, ReasoningStage,
};
