mod assemble;
mod planning;

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use healer::{
    diagnosis::{Diagnosis, DiagnosisSource, DiagnosisStatus, HypothesisSource, RootCauseHypothesis},
    gate::PolicyConfig,
    planner::{PlanDraft, PlanSource, RemediationAction, ResponsePlanner, catalog},
    reasoning::{
        BoundedReasoner, ReasoningRequest, RetryPolicy, StageBudget,
        testing::{ReasonerFuture, ScriptedReasoner},
    },
    types::{
        BusinessImpact, Category, Confidence, Criticality, Incident, IncidentStatus, Severity,
    },
};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

fn conf(value: f64) -> Confidence {
    Confidence::new(value).expect("test confidence must be valid")
}

fn incident(category: Category, severity: Severity) -> Incident {
    Incident {
        id: "INC-P1".to_string(),
        description: "batch host pegged at 100% cpu".to_string(),
        category,
        severity,
        affected_systems: ["prod-batch-04".to_string()].into_iter().collect::<BTreeSet<_>>(),
        symptoms: vec!["cpu saturation".to_string()],
        metadata: BTreeMap::new(),
        business_impact: BusinessImpact {
            criticality: Criticality::Medium,
            sla_target: "99.9%".to_string(),
            affected_users: None,
            summary: None,
        },
        status: IncidentStatus::Diagnosed,
        received_at: OffsetDateTime::now_utc(),
    }
}

fn hypothesis(description: &str, confidence: f64, actions: &[&str]) -> RootCauseHypothesis {
    RootCauseHypothesis {
        description: description.to_string(),
        confidence: conf(confidence),
        evidence: vec![format!("{description} evidence")],
        source: HypothesisSource::Reasoning,
        last_seen: None,
        recommended_actions: actions.iter().map(|action| action.to_string()).collect(),
        competing: false,
    }
}

fn diagnosis(hypotheses: Vec<RootCauseHypothesis>) -> Diagnosis {
    Diagnosis {
        conflict: hypotheses.iter().any(|hypothesis| hypothesis.competing),
        hypotheses,
        status: DiagnosisStatus::Conclusive,
        source: DiagnosisSource::Correlated,
        attempts: 1,
    }
}

fn action(name: &str) -> RemediationAction {
    RemediationAction {
        name: name.to_string(),
        risk: catalog::action_risk(name),
        parameters: BTreeMap::new(),
    }
}

fn draft(primary: &str, fallbacks: &[&str], feasibility: f64) -> PlanDraft {
    PlanDraft {
        primary: action(primary),
        fallbacks: fallbacks.iter().map(|name| action(name)).collect(),
        feasibility: conf(feasibility),
        source: PlanSource::Reasoning,
        rationale: None,
        attempts: 1,
    }
}

fn planner(
    policy: PolicyConfig,
    planning: impl Fn(ReasoningRequest) -> ReasonerFuture + Send + Sync + 'static,
) -> (ScriptedReasoner, ResponsePlanner) {
    let port = ScriptedReasoner::uniform(Arc::new(planning));
    let reasoner = BoundedReasoner::new(Arc::new(port.clone()), RetryPolicy::default());
    (port, ResponsePlanner::new(reasoner, Arc::new(policy)))
}

fn budget() -> StageBudget {
    StageBudget::starting_now(Duration::from_secs(30), CancellationToken::new())
}
