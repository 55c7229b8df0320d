use std::sync::Arc;

use healer::{
    audit::AuditStatus,
    gate::{DecisionOutcome, PolicyRule},
    orchestrator::{ApprovalResult, ExecutionResult},
    types::{IncidentStatus, Stage},
};
use serde_json::{Value, json};

use super::{FixedApproval, PipelineBuilder, diagnosed, planned, report, unused};

fn critical_database(id: &str) -> Value {
    json!({
        "incident_id": id,
        "description": "prod-db-01 write latency above 5s, orders failing",
        "category": "database_performance",
        "severity": "critical",
        "affected_systems": ["prod-db-01"],
    })
}

#[tokio::test]
async fn given_critical_incident_when_approver_accepts_then_plan_is_executed() {
    let pipeline = PipelineBuilder::new(
        unused(),
        diagnosed("long transaction holding locks", 0.99),
        planned("kill_blocking_queries", 0.99),
    )
    .approvals(Arc::new(FixedApproval(ApprovalResult::Approved)))
    .build();

    let outcome = pipeline.handle(report(critical_database("INC-AP1"))).await;

    assert_eq!(outcome.decision, DecisionOutcome::RequireApproval);
    assert_eq!(outcome.rule, PolicyRule::SeverityOverride);
    assert_eq!(outcome.status, IncidentStatus::Executed);
    assert_eq!(outcome.human_response, Some(AuditStatus::Approved));
    assert_eq!(outcome.execution, Some(ExecutionResult::Success));
    assert_eq!(pipeline.executor.executed(), vec!["kill_blocking_queries"]);

    let tail = pipeline
        .stages("INC-AP1")
        .into_iter()
        .skip_while(|(stage, _)| *stage != Stage::Gate)
        .collect::<Vec<_>>();
    assert_eq!(
        tail,
        vec![
            (Stage::Gate, "decided"),
            (Stage::Approval, "approved"),
            (Stage::Execution, "completed"),
        ]
    );
}

#[tokio::test]
async fn given_critical_incident_when_approver_rejects_then_incident_is_closed_unexecuted() {
    let pipeline = PipelineBuilder::new(
        unused(),
        diagnosed("long transaction holding locks", 0.99),
        planned("kill_blocking_queries", 0.99),
    )
    .approvals(Arc::new(FixedApproval(ApprovalResult::Rejected)))
    .build();

    let outcome = pipeline.handle(report(critical_database("INC-AP2"))).await;

    assert_eq!(outcome.status, IncidentStatus::Rejected);
    assert_eq!(outcome.human_response, Some(AuditStatus::Rejected));
    assert!(outcome.execution.is_none());
    assert!(pipeline.executor.executed().is_empty());
    assert!(pipeline.notifier.reasons().is_empty());
}

#[tokio::test]
async fn given_medium_confidence_plan_when_approved_then_validation_path_executes() {
    let pipeline = PipelineBuilder::new(
        unused(),
        diagnosed("memory leak in session cache", 0.8),
        planned("memory_cleanup", 0.9),
    )
    .approvals(Arc::new(FixedApproval(ApprovalResult::Approved)))
    .build();

    let outcome = pipeline
        .handle(report(json!({
            "incident_id": "INC-AP3",
            "description": "prod-app-02 memory at 92%",
            "category": "memory",
            "severity": "medium",
        })))
        .await;

    assert_eq!(outcome.rule, PolicyRule::RequireValidation);
    assert_eq!(outcome.status, IncidentStatus::Executed);
    assert_eq!(pipeline.executor.executed(), vec!["memory_cleanup"]);
    assert!(outcome.human_response_deadline.is_some_and(|deadline| {
        deadline - outcome.decided_at == time::Duration::minutes(15)
    }));
}

#[tokio::test]
async fn given_risky_plan_when_confidence_is_high_then_risk_ceiling_requires_approval() {
    let pipeline = PipelineBuilder::new(
        unused(),
        diagnosed("primary database node degraded", 0.95),
        planned("failover_database", 0.95),
    )
    .build();

    let outcome = pipeline
        .handle(report(json!({
            "incident_id": "INC-AP4",
            "description": "prod-db-02 disk errors on primary",
            "category": "database_performance",
            "severity": "low",
        })))
        .await;

    assert_eq!(outcome.decision, DecisionOutcome::RequireApproval);
    assert_eq!(outcome.rule, PolicyRule::RiskCeiling);
    assert_eq!(outcome.status, IncidentStatus::PendingApproval);
    assert!(pipeline.executor.executed().is_empty());
}
