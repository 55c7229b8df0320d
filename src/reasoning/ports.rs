use async_trait::async_trait;

use crate::reasoning::{
    error::ReasoningError,
    types::{ReasoningRequest, ReasoningResponse},
};

/// Typed boundary to the external text-reasoning capability.
///
/// Implementations must fail with a timeout error rather than exceed
/// `request.timeout`. Retrying is the caller's job.
#[async_trait]
pub trait ReasoningPort: Send + Sync {
    async fn reason(&self, request: ReasoningRequest)
    -> Result<ReasoningResponse, ReasoningError>;
}
