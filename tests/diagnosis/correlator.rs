use healer::{
    diagnosis::{DiagnosisErrorKind, DiagnosisSource, DiagnosisStatus, HypothesisSource, NoopHistory},
    gate::PolicyConfig,
    reasoning::{
        ReasoningErrorKind,
        error::unavailable,
        testing::{fail, respond},
    },
    types::{Category, Severity},
};
use serde_json::json;
use std::sync::Arc;

use super::{budget, correlator, history, incident, resolved};

#[tokio::test]
async fn given_ranked_reasoning_hypotheses_when_diagnosed_then_best_is_first_and_conclusive() {
    let (_port, correlator) = correlator(PolicyConfig::default(), Arc::new(NoopHistory), |_request| {
        respond(
            json!({"hypotheses": [
                {"description": "slow query plan", "confidence": 0.6, "evidence": ["p99 latency"]},
                {"description": "connection pool exhausted", "confidence": 0.85,
                 "evidence": ["p99 latency", "pool wait time"], "recommended_actions": ["scale_resources"]},
            ]}),
            0.9,
        )
    });

    let diagnosis = correlator
        .diagnose(&incident(Category::DatabasePerformance, Severity::Medium, &["prod-db-01"]), &budget())
        .await
        .expect("diagnosis succeeds");

    assert_eq!(diagnosis.status, DiagnosisStatus::Conclusive);
    assert_eq!(diagnosis.source, DiagnosisSource::Correlated);
    assert!(!diagnosis.conflict);
    let top = diagnosis.top().expect("has hypotheses");
    assert_eq!(top.description, "connection pool exhausted");
    assert_eq!(top.confidence.value(), 0.85);
    assert_eq!(diagnosis.triggering().len(), 1);
}

#[tokio::test]
async fn given_accepted_hypotheses_with_disjoint_evidence_when_diagnosed_then_conflict_is_flagged() {
    let (_port, correlator) = correlator(PolicyConfig::default(), Arc::new(NoopHistory), |_request| {
        respond(
            json!({"hypotheses": [
                {"description": "bad deploy", "confidence": 0.8, "evidence": ["error spike after release"]},
                {"description": "network partition", "confidence": 0.75, "evidence": ["packet loss on uplink"]},
            ]}),
            0.95,
        )
    });

    let diagnosis = correlator
        .diagnose(&incident(Category::ApplicationPerformance, Severity::Medium, &[]), &budget())
        .await
        .expect("diagnosis succeeds");

    assert!(diagnosis.conflict);
    assert!(diagnosis.hypotheses.iter().all(|hypothesis| hypothesis.competing));
    assert_eq!(diagnosis.triggering().len(), 2);
}

#[tokio::test]
async fn given_hypothesis_above_response_confidence_when_diagnosed_then_it_is_capped() {
    let (_port, correlator) = correlator(PolicyConfig::default(), Arc::new(NoopHistory), |_request| {
        respond(
            json!({"hypotheses": [{"description": "disk full", "confidence": 0.95}]}),
            0.6,
        )
    });

    let diagnosis = correlator
        .diagnose(&incident(Category::Disk, Severity::Low, &[]), &budget())
        .await
        .expect("diagnosis succeeds");
    assert_eq!(diagnosis.best_confidence().value(), 0.6);
}

#[tokio::test]
async fn given_top_hypothesis_below_low_threshold_when_diagnosed_then_inconclusive() {
    let (_port, correlator) = correlator(PolicyConfig::default(), Arc::new(NoopHistory), |_request| {
        respond(
            json!({"hypotheses": [{"description": "cosmic rays", "confidence": 0.4}]}),
            0.9,
        )
    });

    let diagnosis = correlator
        .diagnose(&incident(Category::Cpu, Severity::Low, &[]), &budget())
        .await
        .expect("inconclusive is not an error");
    assert!(diagnosis.is_inconclusive());
    assert_eq!(diagnosis.best_confidence().value(), 0.4);
}

#[tokio::test]
async fn given_no_hypotheses_when_diagnosed_then_placeholder_is_inconclusive() {
    let (_port, correlator) = correlator(PolicyConfig::default(), Arc::new(NoopHistory), |_request| {
        respond(json!({"hypotheses": []}), 0.9)
    });

    let diagnosis = correlator
        .diagnose(&incident(Category::Other, Severity::Low, &[]), &budget())
        .await
        .expect("inconclusive is not an error");
    assert!(diagnosis.is_inconclusive());
    assert_eq!(diagnosis.hypotheses.len(), 1);
    assert_eq!(diagnosis.hypotheses[0].source, HypothesisSource::Placeholder);
    assert_eq!(diagnosis.best_confidence().value(), 0.0);
}

#[tokio::test]
async fn given_reasoning_repeats_a_historical_cause_when_diagnosed_then_it_is_corroborated() {
    let past = history(vec![resolved(
        Category::Disk,
        &["prod-db-01"],
        "Log volume filled by debug logging",
        0.7,
        3,
    )]);
    let (_port, correlator) = correlator(PolicyConfig::default(), past, |_request| {
        respond(
            json!({"hypotheses": [{"description": "log volume filled by debug logging",
                                   "confidence": 0.9, "evidence": ["/var/log at 98%"]}]}),
            0.9,
        )
    });

    let diagnosis = correlator
        .diagnose(&incident(Category::Disk, Severity::Medium, &["prod-db-01"]), &budget())
        .await
        .expect("diagnosis succeeds");

    assert_eq!(diagnosis.hypotheses.len(), 1);
    let top = diagnosis.top().expect("has hypotheses");
    assert_eq!(top.source, HypothesisSource::Corroborated);
    assert_eq!(top.confidence.value(), 0.9);
    assert_eq!(top.evidence.len(), 2);
    assert!(top.last_seen.is_some());
}

#[tokio::test(start_paused = true)]
async fn given_reasoning_unavailable_when_fallback_enabled_then_history_alone_is_used() {
    let past = history(vec![resolved(
        Category::Memory,
        &["prod-app-02"],
        "memory leak in session cache",
        0.75,
        10,
    )]);
    let (port, correlator) = correlator(PolicyConfig::default(), past, |_request| {
        fail(unavailable("backend down"))
    });

    let diagnosis = correlator
        .diagnose(&incident(Category::Memory, Severity::Medium, &["prod-app-02"]), &budget())
        .await
        .expect("history fallback applies");

    assert_eq!(diagnosis.source, DiagnosisSource::HistoryOnly);
    assert_eq!(diagnosis.attempts, 2);
    assert_eq!(port.calls().await.len(), 2);
    let top = diagnosis.top().expect("has hypotheses");
    assert_eq!(top.source, HypothesisSource::Historical);
    assert_eq!(top.recommended_actions, vec!["restart_service".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn given_reasoning_unavailable_when_fallback_disabled_then_diagnosis_fails() {
    let mut policy = PolicyConfig::default();
    policy.fallback_on_failure = false;
    let (_port, correlator) = correlator(policy, Arc::new(NoopHistory), |_request| {
        fail(unavailable("backend down"))
    });

    let err = correlator
        .diagnose(&incident(Category::Network, Severity::High, &[]), &budget())
        .await
        .expect_err("no fallback");
    assert_eq!(err.kind, DiagnosisErrorKind::ReasoningFailed);
    assert_eq!(err.cause, Some(ReasoningErrorKind::Unavailable));
    assert_eq!(err.attempts, 2);
}

#[tokio::test]
async fn given_hypothesis_confidence_out_of_range_when_fallback_enabled_then_history_alone_is_used() {
    let past = history(vec![resolved(
        Category::Disk,
        &["prod-db-01"],
        "log volume filled by debug logging",
        0.7,
        3,
    )]);
    let (port, correlator) = correlator(PolicyConfig::default(), past, |_request| {
        respond(
            json!({"hypotheses": [{"description": "disk full", "confidence": 1.3}]}),
            0.9,
        )
    });

    let diagnosis = correlator
        .diagnose(&incident(Category::Disk, Severity::Low, &["prod-db-01"]), &budget())
        .await
        .expect("schema mismatch takes the history fallback");

    assert_eq!(diagnosis.source, DiagnosisSource::HistoryOnly);
    assert_eq!(diagnosis.attempts, 1);
    assert_eq!(port.calls().await.len(), 1);
    let top = diagnosis.top().expect("has hypotheses");
    assert_eq!(top.source, HypothesisSource::Historical);
    assert!(diagnosis.hypotheses.iter().all(|hypothesis| hypothesis.description != "disk full"));
}

#[tokio::test]
async fn given_hypothesis_confidence_out_of_range_when_fallback_disabled_then_schema_mismatch() {
    let policy = PolicyConfig {
        fallback_on_failure: false,
        ..PolicyConfig::default()
    };
    let (_port, correlator) = correlator(policy, Arc::new(NoopHistory), |_request| {
        respond(
            json!({"hypotheses": [{"description": "disk full", "confidence": 1.3}]}),
            0.9,
        )
    });

    let err = correlator
        .diagnose(&incident(Category::Disk, Severity::Low, &[]), &budget())
        .await
        .expect_err("1.3 is not a confidence");
    assert_eq!(err.cause, Some(ReasoningErrorKind::SchemaMismatch));
    assert_eq!(err.cause_label(), "schema_mismatch");
    assert_eq!(err.attempts, 1);
}
