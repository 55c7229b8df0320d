use async_trait::async_trait;

use crate::reasoning::{
    error::{ReasoningError, unavailable},
    ports::ReasoningPort,
    types::{ReasoningRequest, ReasoningResponse},
};

/// Used when no reasoning backend is configured. Every call fails as
/// unavailable (non-retryable) so stages go straight to their fallback path.
#[derive(Debug, Clone, Default)]
pub struct OfflineReasoner;

#[async_trait]
impl ReasoningPort for OfflineReasoner {
    async fn reason(
        &self,
        request: ReasoningRequest,
    ) -> Result<ReasoningResponse, ReasoningError> {
        Err(unavailable(format!(
            "no reasoning backend configured for {} stage",
            request.stage.as_str()
        ))
        .with_retryable(false))
    }
}
