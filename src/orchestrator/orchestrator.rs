use std::{future::Future, sync::Arc};

use serde::Serialize;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::{
    audit::{AuditEntry, AuditStatus, AuditTrail},
    classifier::{ClassificationSource, Classifier},
    diagnosis::{
        Diagnosis, DiagnosisSource, DiagnosticCorrelator, HistoricalPatternPort,
        RootCauseHypothesis,
    },
    gate::{
        DecisionOutcome, EscalationDecision, EscalationGate, GateInput, PolicyConfig, PolicyRule,
        StageFailure,
        deadline::{human_response_deadline, human_response_window},
    },
    intake::{IncidentDraft, IncidentReport},
    orchestrator::{
        noop::{LoggingExecutor, LoggingNotifier, UnattendedApproval},
        ports::{ApprovalPort, ApprovalResult, EscalationNotifierPort, ExecutionPort, ExecutionResult},
        state::IncidentState,
    },
    planner::{PlanSource, RemediationPlan, ResponsePlanner},
    reasoning::{BoundedReasoner, StageBudget},
    types::{Confidence, Incident, IncidentId, IncidentStatus, Severity, Stage},
};

const SUMMARY_LIMIT: usize = 240;

#[derive(Clone)]
pub struct Collaborators {
    pub executor: Arc<dyn ExecutionPort>,
    pub approvals: Arc<dyn ApprovalPort>,
    pub notifier: Arc<dyn EscalationNotifierPort>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            executor: Arc::new(LoggingExecutor),
            approvals: Arc::new(UnattendedApproval),
            notifier: Arc::new(LoggingNotifier),
        }
    }
}

/// Terminal report for one incident: what was decided, by which rule, and on what evidence.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentOutcome {
    pub incident_id: IncidentId,
    pub status: IncidentStatus,
    pub decision: DecisionOutcome,
    pub rule: PolicyRule,
    pub severity: Severity,
    pub confidence: Option<Confidence>,
    pub classification_confidence: Option<Confidence>,
    pub incident: Incident,
    pub hypotheses: Vec<RootCauseHypothesis>,
    pub plan: Option<RemediationPlan>,
    pub execution: Option<ExecutionResult>,
    pub human_response: Option<AuditStatus>,
    #[serde(with = "time::serde::rfc3339")]
    pub decided_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub human_response_deadline: Option<OffsetDateTime>,
    /// Post-decision stages whose audit record could not be written.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unrecorded: Vec<Stage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interruption {
    TimedOut,
    Cancelled,
}

/// Per-incident working set, filled stage by stage and read by the gate.
struct Run {
    input: GateInput,
    incident: Incident,
    classification_confidence: Option<Confidence>,
    diagnosis: Option<Diagnosis>,
    plan: Option<RemediationPlan>,
}

/// Drives one incident through classification, diagnosis, planning and the gate.
///
/// Every per-incident failure ends here as a gate outcome plus an audit record.
pub struct Orchestrator {
    policy: Arc<PolicyConfig>,
    classifier: Classifier,
    correlator: DiagnosticCorrelator,
    planner: ResponsePlanner,
    gate: EscalationGate,
    audit: Arc<AuditTrail>,
    collaborators: Collaborators,
}

impl Orchestrator {
    pub fn new(
        policy: Arc<PolicyConfig>,
        reasoner: BoundedReasoner,
        history: Arc<dyn HistoricalPatternPort>,
        audit: Arc<AuditTrail>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            classifier: Classifier::new(reasoner.clone()),
            correlator: DiagnosticCorrelator::new(reasoner.clone(), history, Arc::clone(&policy)),
            planner: ResponsePlanner::new(reasoner, Arc::clone(&policy)),
            gate: EscalationGate::new(Arc::clone(&policy)),
            policy,
            audit,
            collaborators,
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn gate(&self) -> &EscalationGate {
        &self.gate
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub async fn handle(&self, report: IncidentReport, cancel: CancellationToken) -> IncidentOutcome {
        let received_at = OffsetDateTime::now_utc();
        let draft = report.into_draft(received_at);
        let budget = StageBudget::starting_now(self.policy.pipeline_timeout(), cancel);
        let mut state = IncidentState::new(draft.id.clone(), received_at);

        let mut provisional = Classifier::fallback(&draft, Confidence::ZERO).incident;
        provisional.status = IncidentStatus::Received;
        let mut input = GateInput::new(provisional.severity);
        input.non_actionable = !draft.actionable;
        let mut run = Run {
            input,
            incident: provisional,
            classification_confidence: None,
            diagnosis: None,
            plan: None,
        };

        tracing::info!(
            target: "orchestrator",
            incident_id = %draft.id,
            structured = draft.structured,
            actionable = draft.actionable,
            systems = draft.affected_systems.len(),
            "incident_received"
        );

        self.run_pipeline(&draft, &budget, &mut state, &mut run).await;
        self.conclude(&mut state, run, budget.cancel_token()).await
    }

    async fn run_pipeline(
        &self,
        draft: &IncidentDraft,
        budget: &StageBudget,
        state: &mut IncidentState,
        run: &mut Run,
    ) {
        let id = draft.id.as_str();
        let intake = AuditEntry::new(Stage::Intake, AuditStatus::Completed)
            .input(summarize(&draft.description))
            .output(format!(
                "systems={} symptoms={} structured={}",
                draft.affected_systems.len(),
                draft.symptoms.len(),
                draft.structured
            ))
            .severity(draft.explicit_severity)
            .non_actionable(!draft.actionable);
        if !self.record(id, intake, run) {
            return;
        }
        if !draft.actionable && self.policy.reject_non_actionable {
            return;
        }

        // Classification.
        if self.checkpoint(id, Stage::Classification, budget, run) {
            return;
        }
        let classification = match bounded(budget, self.classifier.classify(draft, budget)).await
        {
            Ok(Ok(classification)) => classification,
            Ok(Err(err)) => {
                if let Some(interruption) = interruption_of(budget) {
                    self.interrupted(id, Stage::Classification, interruption, run);
                    return;
                }
                if !self.policy.fallback_on_failure {
                    let entry = AuditEntry::new(Stage::Classification, AuditStatus::Failed)
                        .input(summarize(&draft.description))
                        .output(err.message.clone())
                        .failure(err.cause.as_str())
                        .attempts(err.attempts);
                    run.input.stage_failure = Some(StageFailure {
                        stage: Stage::Classification,
                        kind: err.cause.as_str().to_string(),
                        message: err.message,
                    });
                    self.record(id, entry, run);
                    return;
                }

                tracing::warn!(
                    target: "orchestrator",
                    incident_id = id,
                    error = %err,
                    attempts = err.attempts,
                    "classification_fallback_applied"
                );
                let mut fallback = Classifier::fallback(draft, self.policy.fallback_confidence());
                fallback.attempts = err.attempts;
                let entry = AuditEntry::new(Stage::Classification, AuditStatus::FallbackApplied)
                    .input(summarize(&draft.description))
                    .output(format!(
                        "category={} severity={} (default after {})",
                        fallback.incident.category,
                        fallback.incident.severity,
                        err.cause.as_str()
                    ))
                    .failure(err.cause.as_str())
                    .confidence(Some(fallback.confidence))
                    .severity(Some(fallback.incident.severity))
                    .attempts(err.attempts);
                run.input.severity = fallback.incident.severity;
                if !self.record(id, entry, run) {
                    return;
                }
                fallback
            }
            Err(interruption) => {
                self.interrupted(id, Stage::Classification, interruption, run);
                return;
            }
        };

        run.incident = classification.incident.clone();
        run.input.severity = classification.incident.severity;
        run.classification_confidence = Some(classification.confidence);
        if classification.source != ClassificationSource::Fallback {
            let entry = AuditEntry::new(Stage::Classification, AuditStatus::Completed)
                .input(summarize(&draft.description))
                .output(format!(
                    "category={} severity={} source={:?} criticality={:?}",
                    classification.incident.category,
                    classification.incident.severity,
                    classification.source,
                    classification.incident.business_impact.criticality
                ))
                .confidence(Some(classification.confidence))
                .severity(Some(classification.incident.severity))
                .attempts(classification.attempts);
            if !self.record(id, entry, run) {
                return;
            }
        }
        self.transition(state, IncidentStatus::Classified);
        run.incident.status = IncidentStatus::Classified;

        // Diagnosis.
        if self.checkpoint(id, Stage::Diagnosis, budget, run) {
            return;
        }
        let incident = run.incident.clone();
        let diagnosis = match bounded(budget, self.correlator.diagnose(&incident, budget)).await {
            Ok(Ok(diagnosis)) => diagnosis,
            Ok(Err(err)) => {
                if let Some(interruption) = interruption_of(budget) {
                    self.interrupted(id, Stage::Diagnosis, interruption, run);
                    return;
                }
                let entry = AuditEntry::new(Stage::Diagnosis, AuditStatus::Failed)
                    .input(incident_summary(&incident))
                    .output(err.message.clone())
                    .failure(err.cause_label())
                    .severity(Some(incident.severity))
                    .attempts(err.attempts);
                run.input.stage_failure = Some(StageFailure {
                    stage: Stage::Diagnosis,
                    kind: err.cause_label().to_string(),
                    message: err.message,
                });
                self.record(id, entry, run);
                return;
            }
            Err(interruption) => {
                self.interrupted(id, Stage::Diagnosis, interruption, run);
                return;
            }
        };

        let status = if diagnosis.is_inconclusive() {
            AuditStatus::Inconclusive
        } else if diagnosis.source == DiagnosisSource::HistoryOnly {
            AuditStatus::FallbackApplied
        } else {
            AuditStatus::Completed
        };
        let entry = AuditEntry::new(Stage::Diagnosis, status)
            .input(incident_summary(&incident))
            .output(diagnosis_summary(&diagnosis))
            .confidence(Some(diagnosis.best_confidence()))
            .severity(Some(incident.severity))
            .attempts(diagnosis.attempts);
        let inconclusive = diagnosis.is_inconclusive();
        run.diagnosis = Some(diagnosis);
        if !self.record(id, entry, run) {
            return;
        }
        self.transition(state, IncidentStatus::Diagnosed);
        run.incident.status = IncidentStatus::Diagnosed;
        if inconclusive {
            run.input.diagnosis_inconclusive = true;
            return;
        }

        // Planning.
        if self.checkpoint(id, Stage::Planning, budget, run) {
            return;
        }
        let Some(diagnosis) = run.diagnosis.clone() else {
            return;
        };
        let classification_confidence = run
            .classification_confidence
            .unwrap_or(Confidence::ZERO);
        let planned = bounded(
            budget,
            self.planner
                .plan(&incident, classification_confidence, &diagnosis, budget),
        )
        .await;
        let plan = match planned {
            Ok(Ok(plan)) => plan,
            Ok(Err(err)) => {
                if let Some(interruption) = interruption_of(budget) {
                    self.interrupted(id, Stage::Planning, interruption, run);
                    return;
                }
                let entry = AuditEntry::new(Stage::Planning, AuditStatus::Failed)
                    .input(diagnosis_summary(&diagnosis))
                    .output(err.message.clone())
                    .failure(err.cause_label())
                    .severity(Some(incident.severity))
                    .attempts(err.attempts);
                run.input.stage_failure = Some(StageFailure {
                    stage: Stage::Planning,
                    kind: err.cause_label().to_string(),
                    message: err.message,
                });
                self.record(id, entry, run);
                return;
            }
            Err(interruption) => {
                self.interrupted(id, Stage::Planning, interruption, run);
                return;
            }
        };

        let status = match plan.source {
            PlanSource::Reasoning => AuditStatus::Completed,
            PlanSource::Catalog => AuditStatus::FallbackApplied,
        };
        let entry = AuditEntry::new(Stage::Planning, status)
            .input(diagnosis_summary(&diagnosis))
            .output(format!(
                "primary={} fallbacks=[{}] feasibility={} risk_escalated={}",
                plan.primary.name,
                plan.fallbacks
                    .iter()
                    .map(|action| action.name.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                plan.feasibility,
                plan.risk_escalated
            ))
            .confidence(Some(plan.confidence))
            .severity(Some(incident.severity))
            .risk(Some(plan.risk))
            .attempts(plan.attempts);
        run.input.plan_confidence = Some(plan.confidence);
        run.input.plan_risk = Some(plan.risk);
        run.plan = Some(plan);
        if !self.record(id, entry, run) {
            return;
        }
        self.transition(state, IncidentStatus::Planned);
        run.incident.status = IncidentStatus::Planned;
    }

    async fn conclude(
        &self,
        state: &mut IncidentState,
        mut run: Run,
        cancel: &CancellationToken,
    ) -> IncidentOutcome {
        let id = state.incident_id().to_string();
        let decided_at = OffsetDateTime::now_utc();
        let mut decision = self.gate.decide(&id, &run.input, decided_at);
        let mut unrecorded = Vec::new();
        if self
            .audit
            .append(&id, gate_entry(&decision, &run.input))
            .is_err()
        {
            if run.input.audit_failed {
                unrecorded.push(Stage::Gate);
            } else {
                // A decision that cannot be audited must not act.
                run.input.audit_failed = true;
                decision = self.gate.decide(&id, &run.input, decided_at);
                self.record_after_gate(&id, gate_entry(&decision, &run.input), &mut unrecorded);
            }
        }

        let mut execution = None;
        let mut human_response = None;
        let mut deadline = None;
        match decision.outcome {
            DecisionOutcome::AutoExecute => match run.plan.clone() {
                Some(plan) => {
                    execution = Some(
                        self.execute(state, &run.incident, &plan, cancel, &mut unrecorded)
                            .await,
                    );
                }
                None => {
                    self.transition(state, IncidentStatus::Escalated);
                    human_response =
                        Some(self.escalate(&run.incident, "missing_plan", cancel, &mut unrecorded).await);
                }
            },
            DecisionOutcome::RequireApproval => {
                self.transition(state, IncidentStatus::PendingApproval);
                let severity = run.incident.severity;
                deadline = Some(human_response_deadline(&self.policy, severity, decided_at));
                match run.plan.clone() {
                    Some(plan) => {
                        let (result, response) = self
                            .await_approval(
                                state,
                                &run.incident,
                                &plan,
                                decided_at,
                                cancel,
                                &mut unrecorded,
                            )
                            .await;
                        execution = result;
                        human_response = response;
                    }
                    None => {
                        self.transition(state, IncidentStatus::Escalated);
                        human_response =
                            Some(self.escalate(&run.incident, "missing_plan", cancel, &mut unrecorded).await);
                    }
                }
            }
            DecisionOutcome::EscalateHuman => {
                self.transition(state, IncidentStatus::Escalated);
                deadline = Some(human_response_deadline(
                    &self.policy,
                    run.incident.severity,
                    decided_at,
                ));
                human_response = Some(
                    self.escalate(&run.incident, decision.rule.as_str(), cancel, &mut unrecorded)
                        .await,
                );
            }
            DecisionOutcome::RejectLowConfidence => {
                self.transition(state, IncidentStatus::Rejected);
            }
        }

        run.incident.status = state.status();
        tracing::info!(
            target: "orchestrator",
            incident_id = %id,
            status = ?state.status(),
            outcome = decision.outcome.as_str(),
            rule = decision.rule.as_str(),
            confidence = decision.confidence.map(Confidence::value),
            unrecorded = unrecorded.len(),
            "incident_concluded"
        );

        IncidentOutcome {
            incident_id: id,
            status: state.status(),
            decision: decision.outcome,
            rule: decision.rule,
            severity: decision.severity,
            confidence: decision.confidence,
            classification_confidence: run.classification_confidence,
            incident: run.incident,
            hypotheses: run
                .diagnosis
                .map(|diagnosis| diagnosis.hypotheses)
                .unwrap_or_default(),
            plan: run.plan,
            execution,
            human_response,
            decided_at,
            human_response_deadline: deadline,
            unrecorded,
        }
    }

    async fn execute(
        &self,
        state: &mut IncidentState,
        incident: &Incident,
        plan: &RemediationPlan,
        cancel: &CancellationToken,
        unrecorded: &mut Vec<Stage>,
    ) -> ExecutionResult {
        let result = self.collaborators.executor.execute(plan).await;
        match &result {
            ExecutionResult::Success => {
                let entry = AuditEntry::new(Stage::Execution, AuditStatus::Completed)
                    .input(plan.primary.name.clone())
                    .output("success")
                    .confidence(Some(plan.confidence))
                    .risk(Some(plan.risk));
                self.record_after_gate(&incident.id, entry, unrecorded);
                self.transition(state, IncidentStatus::Executed);
            }
            ExecutionResult::Failed { reason } => {
                tracing::warn!(
                    target: "orchestrator",
                    incident_id = %incident.id,
                    action = %plan.primary.name,
                    reason = %reason,
                    "execution_failed"
                );
                let entry = AuditEntry::new(Stage::Execution, AuditStatus::Failed)
                    .input(plan.primary.name.clone())
                    .output(summarize(reason))
                    .failure("execution_failed")
                    .risk(Some(plan.risk));
                self.record_after_gate(&incident.id, entry, unrecorded);
                self.transition(state, IncidentStatus::Escalated);
                self.escalate(incident, "execution_failed", cancel, unrecorded)
                    .await;
            }
        }
        result
    }

    async fn await_approval(
        &self,
        state: &mut IncidentState,
        incident: &Incident,
        plan: &RemediationPlan,
        decided_at: OffsetDateTime,
        cancel: &CancellationToken,
        unrecorded: &mut Vec<Stage>,
    ) -> (Option<ExecutionResult>, Option<AuditStatus>) {
        let window = human_response_window(&self.policy, incident.severity);
        let deadline = human_response_deadline(&self.policy, incident.severity, decided_at);
        let answer = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            answer = tokio::time::timeout(
                window,
                self.collaborators.approvals.request(incident, plan, deadline),
            ) => Some(answer.unwrap_or(ApprovalResult::TimedOut)),
        };

        match answer {
            Some(ApprovalResult::Approved) => {
                let entry = AuditEntry::new(Stage::Approval, AuditStatus::Approved)
                    .input(plan.primary.name.clone())
                    .output("approved")
                    .confidence(Some(plan.confidence))
                    .risk(Some(plan.risk));
                if !self.record_after_gate(&incident.id, entry, unrecorded) {
                    self.transition(state, IncidentStatus::Escalated);
                    self.escalate(
                        incident,
                        PolicyRule::AuditWriteFailed.as_str(),
                        cancel,
                        unrecorded,
                    )
                    .await;
                    return (None, Some(AuditStatus::Approved));
                }
                let result = self
                    .execute(state, incident, plan, cancel, unrecorded)
                    .await;
                (Some(result), Some(AuditStatus::Approved))
            }
            Some(ApprovalResult::Rejected) => {
                let entry = AuditEntry::new(Stage::Approval, AuditStatus::Rejected)
                    .input(plan.primary.name.clone())
                    .output("rejected by approver");
                self.record_after_gate(&incident.id, entry, unrecorded);
                self.transition(state, IncidentStatus::Rejected);
                (None, Some(AuditStatus::Rejected))
            }
            Some(ApprovalResult::TimedOut) => {
                tracing::warn!(
                    target: "orchestrator",
                    incident_id = %incident.id,
                    window_secs = window.as_secs(),
                    "human_response_timeout"
                );
                let entry = AuditEntry::new(Stage::Approval, AuditStatus::HumanResponseTimeout)
                    .input(plan.primary.name.clone())
                    .output(format!("no approval within {}s", window.as_secs()))
                    .severity(Some(incident.severity));
                self.record_after_gate(&incident.id, entry, unrecorded);
                self.notify(incident, AuditStatus::HumanResponseTimeout.as_str(), cancel)
                    .await;
                (None, Some(AuditStatus::HumanResponseTimeout))
            }
            None => {
                let entry = AuditEntry::new(Stage::Approval, AuditStatus::Cancelled)
                    .input(plan.primary.name.clone())
                    .output("approval wait cancelled");
                self.record_after_gate(&incident.id, entry, unrecorded);
                (None, Some(AuditStatus::Cancelled))
            }
        }
    }

    /// Notifies escalation and waits at most the severity window for the acknowledgement.
    async fn escalate(
        &self,
        incident: &Incident,
        reason: &str,
        cancel: &CancellationToken,
        unrecorded: &mut Vec<Stage>,
    ) -> AuditStatus {
        let window = human_response_window(&self.policy, incident.severity);
        let acknowledged = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            ack = tokio::time::timeout(
                window,
                self.collaborators.notifier.notify(incident, reason),
            ) => Some(match ack {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(err.message),
                Err(_) => Err(format!("no acknowledgement within {}s", window.as_secs())),
            }),
        };

        let (status, output) = match acknowledged {
            Some(Ok(())) => (AuditStatus::Acknowledged, format!("notified: {reason}")),
            Some(Err(message)) => {
                tracing::warn!(
                    target: "orchestrator",
                    incident_id = %incident.id,
                    reason = reason,
                    error = %message,
                    "human_response_timeout"
                );
                (AuditStatus::HumanResponseTimeout, message)
            }
            None => (AuditStatus::Cancelled, "escalation wait cancelled".to_string()),
        };
        let entry = AuditEntry::new(Stage::Escalation, status)
            .input(reason.to_string())
            .output(output)
            .severity(Some(incident.severity));
        self.record_after_gate(&incident.id, entry, unrecorded);
        status
    }

    /// Terminal facts past the gate cannot change the decision; a failed write
    /// is logged and reported on the outcome instead.
    fn record_after_gate(
        &self,
        incident_id: &str,
        entry: AuditEntry,
        unrecorded: &mut Vec<Stage>,
    ) -> bool {
        let stage = entry.stage;
        match self.audit.append(incident_id, entry) {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(
                    target: "orchestrator",
                    incident_id = incident_id,
                    stage = stage.as_str(),
                    error = %err,
                    "audit_write_failed"
                );
                unrecorded.push(stage);
                false
            }
        }
    }

    async fn notify(&self, incident: &Incident, reason: &str, cancel: &CancellationToken) {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = self.collaborators.notifier.notify(incident, reason) => result,
        };
        if let Err(err) = result {
            tracing::warn!(
                target: "orchestrator",
                incident_id = %incident.id,
                reason = reason,
                error = %err,
                "escalation_notify_failed"
            );
        }
    }

    fn record(&self, incident_id: &str, entry: AuditEntry, run: &mut Run) -> bool {
        match self.audit.append(incident_id, entry) {
            Ok(record) => {
                tracing::info!(
                    target: "orchestrator",
                    incident_id = incident_id,
                    stage = record.stage.as_str(),
                    status = record.status.as_str(),
                    confidence = record.confidence.map(Confidence::value),
                    "stage_recorded"
                );
                true
            }
            Err(_) => {
                run.input.audit_failed = true;
                false
            }
        }
    }

    /// True when the budget is already spent; the interruption is recorded.
    fn checkpoint(
        &self,
        incident_id: &str,
        stage: Stage,
        budget: &StageBudget,
        run: &mut Run,
    ) -> bool {
        match interruption_of(budget) {
            Some(interruption) => {
                self.interrupted(incident_id, stage, interruption, run);
                true
            }
            None => false,
        }
    }

    fn interrupted(&self, incident_id: &str, stage: Stage, interruption: Interruption, run: &mut Run) {
        let (status, output) = match interruption {
            Interruption::TimedOut => {
                run.input.timed_out = true;
                (
                    AuditStatus::TimedOut,
                    format!(
                        "pipeline exceeded {}s during {}",
                        self.policy.timeout_seconds,
                        stage.as_str()
                    ),
                )
            }
            Interruption::Cancelled => {
                run.input.cancelled = true;
                (
                    AuditStatus::Cancelled,
                    format!("cancelled during {}", stage.as_str()),
                )
            }
        };
        tracing::warn!(
            target: "orchestrator",
            incident_id = incident_id,
            stage = stage.as_str(),
            status = status.as_str(),
            "stage_interrupted"
        );
        let entry = AuditEntry::new(stage, status)
            .output(output)
            .severity(Some(run.input.severity));
        self.record(incident_id, entry, run);
    }

    fn transition(&self, state: &mut IncidentState, next: IncidentStatus) {
        if let Err(err) = state.advance(next) {
            tracing::error!(
                target: "orchestrator",
                incident_id = state.incident_id(),
                error = %err,
                "invalid_transition"
            );
        }
    }
}

/// Runs a stage under the incident's deadline and cancellation token.
async fn bounded<T>(budget: &StageBudget, stage: impl Future<Output = T>) -> Result<T, Interruption> {
    tokio::select! {
        biased;
        _ = budget.cancel_token().cancelled() => Err(Interruption::Cancelled),
        output = tokio::time::timeout_at(budget.deadline(), stage) => {
            output.map_err(|_| Interruption::TimedOut)
        }
    }
}

fn interruption_of(budget: &StageBudget) -> Option<Interruption> {
    if budget.is_cancelled() {
        Some(Interruption::Cancelled)
    } else if budget.is_expired() {
        Some(Interruption::TimedOut)
    } else {
        None
    }
}

fn gate_entry(decision: &EscalationDecision, input: &GateInput) -> AuditEntry {
    AuditEntry::new(Stage::Gate, AuditStatus::Decided)
        .input(format!(
            "severity={} plan_confidence={} risk={} inconclusive={} stage_failure={}",
            input.severity,
            input
                .plan_confidence
                .map_or_else(|| "-".to_string(), |confidence| confidence.to_string()),
            input.plan_risk.map_or("-", |risk| risk.as_str()),
            input.diagnosis_inconclusive,
            input
                .stage_failure
                .as_ref()
                .map_or("-", |failure| failure.stage.as_str())
        ))
        .output(format!("{} ({})", decision.outcome, decision.rule))
        .confidence(decision.confidence)
        .severity(Some(decision.severity))
        .risk(input.plan_risk)
        .decision(decision.outcome, decision.rule)
        .non_actionable(input.non_actionable)
}

fn incident_summary(incident: &Incident) -> String {
    format!(
        "category={} severity={} systems={}",
        incident.category,
        incident.severity,
        incident.systems_label()
    )
}

fn diagnosis_summary(diagnosis: &Diagnosis) -> String {
    let top = diagnosis
        .top()
        .map_or("-", |hypothesis| hypothesis.description.as_str());
    format!(
        "top={} hypotheses={} conflict={}",
        summarize(top),
        diagnosis.hypotheses.len(),
        diagnosis.conflict
    )
}

fn summarize(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= SUMMARY_LIMIT {
        return text.to_string();
    }
    let mut summary: String = text.chars().take(SUMMARY_LIMIT).collect();
    summary.push_str("...");
    summary
}
