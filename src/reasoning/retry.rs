use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    reasoning::{
        error::{ReasoningError, cancelled, timeout},
        ports::ReasoningPort,
        schema::validate_response,
        types::{ReasoningOutcome, ReasoningRequest, ReasoningStage},
    },
    types::IncidentId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempt budget per stage call, first call included. Zero still makes one call.
    pub max_retries: u32,
    pub call_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            call_timeout: Duration::from_secs(10),
            backoff_base: Duration::from_millis(200),
            backoff_max: Duration::from_millis(2_000),
        }
    }
}

impl RetryPolicy {
    /// `failed_attempt` is the zero-based index of the attempt that just failed.
    pub fn can_retry(&self, err: &ReasoningError, failed_attempt: u32) -> bool {
        err.retryable && failed_attempt + 1 < self.max_retries.max(1)
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_base.as_millis().max(1) as f64;
        let max = self.backoff_max.as_millis().max(1) as f64;
        let exp = (attempt as i32).max(0);
        let without_jitter = (base * 2f64.powi(exp)).min(max);
        let jitter_factor = 0.9 + (attempt as f64 % 3.0) * 0.05;
        Duration::from_millis((without_jitter * jitter_factor) as u64)
    }
}

/// Overall time budget and cancellation for one incident's pipeline.
#[derive(Debug, Clone)]
pub struct StageBudget {
    deadline: Instant,
    cancel: CancellationToken,
}

impl StageBudget {
    pub fn new(deadline: Instant, cancel: CancellationToken) -> Self {
        Self { deadline, cancel }
    }

    pub fn starting_now(total: Duration, cancel: CancellationToken) -> Self {
        Self::new(Instant::now() + total, cancel)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Stage-level description of a reasoning call. The invoker turns it into
/// one `ReasoningRequest` per attempt, always from the same input.
#[derive(Debug, Clone)]
pub struct ReasoningQuery {
    pub incident_id: IncidentId,
    pub stage: ReasoningStage,
    pub instruction: String,
    pub context: Value,
    pub schema: Value,
}

/// The single retry policy shared by every reasoning-backed stage.
#[derive(Clone)]
pub struct BoundedReasoner {
    port: Arc<dyn ReasoningPort>,
    policy: RetryPolicy,
}

impl BoundedReasoner {
    pub fn new(port: Arc<dyn ReasoningPort>, policy: RetryPolicy) -> Self {
        Self { port, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn invoke(
        &self,
        query: &ReasoningQuery,
        budget: &StageBudget,
    ) -> Result<ReasoningOutcome, ReasoningError> {
        let mut attempt: u32 = 0;
        loop {
            if budget.is_cancelled() {
                return Err(cancelled("incident processing cancelled").with_attempts(attempt));
            }
            let remaining = budget.remaining();
            if remaining.is_zero() {
                return Err(timeout("incident time budget exhausted")
                    .with_retryable(false)
                    .with_attempts(attempt));
            }

            let slice = self.policy.call_timeout.min(remaining);
            let request = ReasoningRequest {
                request_id: format!("{}:{}:{}", query.incident_id, query.stage.as_str(), attempt),
                incident_id: query.incident_id.clone(),
                stage: query.stage,
                instruction: query.instruction.clone(),
                context: query.context.clone(),
                schema: query.schema.clone(),
                timeout: slice,
            };

            let result = tokio::select! {
                biased;
                _ = budget.cancel.cancelled() => Err(cancelled("incident processing cancelled")),
                response = tokio::time::timeout(slice, self.port.reason(request)) => match response {
                    Ok(response) => response,
                    Err(_) => Err(timeout(format!(
                        "{} reasoning exceeded {} ms",
                        query.stage.as_str(),
                        slice.as_millis()
                    ))),
                },
            };
            let result = result.and_then(|response| validate_response(&query.schema, response));
            let failed_attempt = attempt;
            attempt += 1;

            let err = match result {
                Ok((result, confidence)) => {
                    return Ok(ReasoningOutcome {
                        result,
                        confidence,
                        attempts: attempt,
                    });
                }
                Err(err) => err,
            };

            if !self.policy.can_retry(&err, failed_attempt) {
                return Err(err.with_attempts(attempt));
            }

            let delay = self.policy.backoff_delay(failed_attempt);
            if delay >= budget.remaining() {
                tracing::warn!(
                    target: "reasoning",
                    incident_id = %query.incident_id,
                    stage = query.stage.as_str(),
                    attempt = attempt,
                    error = %err,
                    "reasoning_retry_skipped_budget"
                );
                return Err(err.with_attempts(attempt));
            }

            tracing::info!(
                target: "reasoning",
                incident_id = %query.incident_id,
                stage = query.stage.as_str(),
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "reasoning_retry_scheduled"
            );

            tokio::select! {
                biased;
                _ = budget.cancel.cancelled() => {
                    return Err(cancelled("incident processing cancelled").with_attempts(attempt));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
