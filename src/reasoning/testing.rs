use std::{future::Future, pin::Pin, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::reasoning::{
    error::ReasoningError,
    ports::ReasoningPort,
    types::{ReasoningRequest, ReasoningResponse, ReasoningStage},
};

pub type ReasonerFuture =
    Pin<Box<dyn Future<Output = Result<ReasoningResponse, ReasoningError>> + Send>>;
pub type ReasonerHook = Arc<dyn Fn(ReasoningRequest) -> ReasonerFuture + Send + Sync>;

pub fn boxed<T>(
    future: impl Future<Output = T> + Send + 'static,
) -> Pin<Box<dyn Future<Output = T> + Send>>
where
    T: Send + 'static,
{
    Box::pin(future)
}

pub fn respond(result: Value, confidence: f64) -> ReasonerFuture {
    boxed(async move { Ok(ReasoningResponse { result, confidence }) })
}

pub fn fail(err: ReasoningError) -> ReasonerFuture {
    boxed(async move { Err(err) })
}

#[derive(Clone)]
pub struct StageHooks {
    pub classification: ReasonerHook,
    pub diagnosis: ReasonerHook,
    pub planning: ReasonerHook,
}

/// Reasoning port driven by test hooks. Records every request it receives.
#[derive(Clone)]
pub struct ScriptedReasoner {
    hooks: StageHooks,
    calls: Arc<Mutex<Vec<ReasoningRequest>>>,
}

impl ScriptedReasoner {
    pub fn new(hooks: StageHooks) -> Self {
        Self {
            hooks,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn uniform(hook: ReasonerHook) -> Self {
        Self::new(StageHooks {
            classification: hook.clone(),
            diagnosis: hook.clone(),
            planning: hook,
        })
    }

    pub async fn calls(&self) -> Vec<ReasoningRequest> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_for(&self, stage: ReasoningStage) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|request| request.stage == stage)
            .count()
    }
}

#[async_trait]
impl ReasoningPort for ScriptedReasoner {
    async fn reason(
        &self,
        request: ReasoningRequest,
    ) -> Result<ReasoningResponse, ReasoningError> {
        self.calls.lock().await.push(request.clone());
        let hook = match request.stage {
            ReasoningStage::Classification => self.hooks.classification.clone(),
            ReasoningStage::Diagnosis => self.hooks.diagnosis.clone(),
            ReasoningStage::Planning => self.hooks.planning.clone(),
        };
        hook(request).await
    }
}
