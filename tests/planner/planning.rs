use healer::{
    gate::PolicyConfig,
    planner::{PlanSource, PlanningErrorKind},
    reasoning::{
        ReasoningErrorKind, ReasoningStage,
        error::unavailable,
        testing::{fail, respond},
    },
    types::{Category, RiskLevel, Severity},
};
use serde_json::json;

use super::{budget, conf, diagnosis, hypothesis, incident, planner};

#[tokio::test]
async fn given_reasoned_plan_when_planning_then_action_names_are_normalized_to_the_catalog() {
    let (port, planner) = planner(PolicyConfig::default(), |_request| {
        respond(
            json!({
                "primary_action": {"name": "Restart-Service", "parameters": {"service": "batch-runner", "grace_seconds": 30}},
                "fallback_actions": [{"name": "rollback deployment"}],
                "rationale": "the job runner leaks threads",
            }),
            0.8,
        )
    });

    let plan = planner
        .plan(
            &incident(Category::Cpu, Severity::Medium),
            conf(0.9),
            &diagnosis(vec![hypothesis("thread leak in job runner", 0.85, &[])]),
            &budget(),
        )
        .await
        .expect("plan succeeds");

    assert_eq!(plan.source, PlanSource::Reasoning);
    assert_eq!(plan.primary.name, "restart_service");
    assert_eq!(plan.primary.risk, RiskLevel::Low);
    assert_eq!(plan.primary.parameters["service"], "batch-runner");
    assert_eq!(plan.primary.parameters["grace_seconds"], "30");
    assert_eq!(plan.fallbacks[0].name, "rollback_deployment");
    assert_eq!(plan.fallbacks[0].risk, RiskLevel::High);
    assert_eq!(plan.feasibility.value(), 0.8);
    assert_eq!(plan.confidence.value(), 0.8);
    assert_eq!(plan.attempts, 1);
    assert_eq!(plan.rationale.as_deref(), Some("the job runner leaks threads"));

    let calls = port.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].stage, ReasoningStage::Planning);
    assert_eq!(calls[0].context["hypotheses"][0]["description"], "thread leak in job runner");
}

#[tokio::test]
async fn given_action_outside_catalog_when_planning_then_it_is_treated_as_high_risk() {
    let (_port, planner) = planner(PolicyConfig::default(), |_request| {
        respond(json!({"primary_action": {"name": "reticulate_splines"}}), 0.9)
    });

    let plan = planner
        .plan(
            &incident(Category::Cpu, Severity::Low),
            conf(0.95),
            &diagnosis(vec![hypothesis("splines unreticulated", 0.9, &[])]),
            &budget(),
        )
        .await
        .expect("plan succeeds");
    assert_eq!(plan.primary.risk, RiskLevel::High);
    assert_eq!(plan.risk, RiskLevel::High);
    assert!(!plan.risk_escalated);
}

#[tokio::test(start_paused = true)]
async fn given_reasoning_unavailable_when_fallback_enabled_then_category_playbook_is_used() {
    let (port, planner) = planner(PolicyConfig::default(), |_request| {
        fail(unavailable("backend down"))
    });

    let plan = planner
        .plan(
            &incident(Category::Cpu, Severity::Medium),
            conf(0.9),
            &diagnosis(vec![hypothesis("runaway job", 0.85, &[])]),
            &budget(),
        )
        .await
        .expect("catalog plan applies");

    assert_eq!(plan.source, PlanSource::Catalog);
    assert_eq!(
        plan.action_names(),
        vec!["scale_resources", "kill_runaway_process", "monitor"]
    );
    assert_eq!(plan.feasibility.value(), 0.5);
    assert_eq!(plan.confidence.value(), 0.5);
    assert_eq!(plan.attempts, 2);
    assert_eq!(port.calls().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn given_reasoning_unavailable_when_fallback_disabled_then_planning_fails() {
    let policy = PolicyConfig {
        fallback_on_failure: false,
        ..PolicyConfig::default()
    };
    let (_port, planner) = planner(policy, |_request| fail(unavailable("backend down")));

    let err = planner
        .plan(
            &incident(Category::Cpu, Severity::Medium),
            conf(0.9),
            &diagnosis(vec![hypothesis("runaway job", 0.85, &[])]),
            &budget(),
        )
        .await
        .expect_err("no fallback");
    assert_eq!(err.kind, PlanningErrorKind::ReasoningFailed);
    assert_eq!(err.cause, Some(ReasoningErrorKind::Unavailable));
    assert_eq!(err.attempts, 2);
}

#[tokio::test]
async fn given_diagnosis_without_hypotheses_when_planning_then_no_reasoning_call_is_made() {
    let (port, planner) = planner(PolicyConfig::default(), |_request| {
        respond(json!({"primary_action": {"name": "monitor"}}), 0.9)
    });

    let err = planner
        .plan(
            &incident(Category::Other, Severity::Low),
            conf(0.9),
            &diagnosis(Vec::new()),
            &budget(),
        )
        .await
        .expect_err("nothing to plan for");
    assert_eq!(err.kind, PlanningErrorKind::NoHypothesis);
    assert_eq!(err.cause_label(), "no_hypothesis");
    assert!(port.calls().await.is_empty());
}

#[tokio::test]
async fn given_plan_missing_primary_action_when_fallback_enabled_then_category_playbook_is_used() {
    let (port, planner) = planner(PolicyConfig::default(), |_request| {
        respond(json!({"fallback_actions": [{"name": "monitor"}]}), 0.9)
    });

    let plan = planner
        .plan(
            &incident(Category::Cpu, Severity::Medium),
            conf(0.9),
            &diagnosis(vec![hypothesis("runaway job", 0.85, &[])]),
            &budget(),
        )
        .await
        .expect("schema mismatch takes the catalog fallback");

    assert_eq!(plan.source, PlanSource::Catalog);
    assert_eq!(plan.primary.name, "scale_resources");
    assert_eq!(plan.feasibility.value(), 0.5);
    assert_eq!(plan.attempts, 1);
    assert_eq!(port.calls_for(ReasoningStage::Planning).await, 1);
}

#[tokio::test]
async fn given_plan_missing_primary_action_when_fallback_disabled_then_schema_mismatch() {
    let policy = PolicyConfig {
        fallback_on_failure: false,
        ..PolicyConfig::default()
    };
    let (_port, planner) = planner(policy, |_request| {
        respond(json!({"primary_action": {"name": 42}}), 0.9)
    });

    let err = planner
        .plan(
            &incident(Category::Cpu, Severity::Medium),
            conf(0.9),
            &diagnosis(vec![hypothesis("runaway job", 0.85, &[])]),
            &budget(),
        )
        .await
        .expect_err("no fallback");
    assert_eq!(err.kind, PlanningErrorKind::ReasoningFailed);
    assert_eq!(err.cause, Some(ReasoningErrorKind::SchemaMismatch));
    assert_eq!(err.cause_label(), "schema_mismatch");
}
