use std::sync::Arc;

use tokio::{sync::Semaphore, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    intake::IncidentReport,
    orchestrator::{
        error::{OrchestratorError, engine_closed, task_failed},
        orchestrator::{IncidentOutcome, Orchestrator},
    },
};

/// Runs incidents concurrently, one task each, with bounded parallelism.
///
/// Each incident's cancellation token is a child of the engine's shutdown token.
#[derive(Clone)]
pub struct IncidentEngine {
    orchestrator: Arc<Orchestrator>,
    permits: Arc<Semaphore>,
    capacity: u32,
    shutdown: CancellationToken,
}

impl IncidentEngine {
    pub fn new(orchestrator: Arc<Orchestrator>, max_concurrent_incidents: usize) -> Self {
        let capacity = u32::try_from(max_concurrent_incidents.max(1)).unwrap_or(u32::MAX);
        Self {
            orchestrator,
            permits: Arc::new(Semaphore::new(capacity as usize)),
            capacity,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn submit(&self, report: IncidentReport) -> JoinHandle<Result<IncidentOutcome, OrchestratorError>> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let permits = Arc::clone(&self.permits);
        let cancel = self.shutdown.child_token();
        tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| engine_closed("incident engine is shut down"))?;
            Ok(orchestrator.handle(report, cancel).await)
        })
    }

    pub async fn process(&self, report: IncidentReport) -> Result<IncidentOutcome, OrchestratorError> {
        if self.shutdown.is_cancelled() {
            return Err(engine_closed("incident engine is shut down"));
        }
        self.submit(report)
            .await
            .map_err(|err| task_failed(format!("incident task failed: {err}")))?
    }

    /// Cancels every incident, queued or in flight. Each still concludes with a
    /// `cancelled` decision and audit record; `process` refuses new reports.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        tracing::info!(target: "orchestrator", "engine_shutdown_requested");
    }

    /// Waits until no incident task holds a permit.
    pub async fn drain(&self) {
        if let Ok(all) = self.permits.acquire_many(self.capacity).await {
            drop(all);
        }
    }
}
