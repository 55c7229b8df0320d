use healer::diagnosis::{
    HypothesisSource,
    correlator::{mark_competing, merge, rank},
};
use time::OffsetDateTime;

use super::hypothesis;

#[test]
fn given_equal_confidence_when_ranked_then_more_evidence_wins() {
    let mut hypotheses = vec![
        hypothesis("thin", 0.8, &["a"]),
        hypothesis("thick", 0.8, &["a", "b", "c"]),
    ];
    rank(&mut hypotheses);
    assert_eq!(hypotheses[0].description, "thick");
}

#[test]
fn given_equal_confidence_and_evidence_when_ranked_then_most_recent_history_wins() {
    let now = OffsetDateTime::now_utc();
    let mut older = hypothesis("older", 0.7, &["a"]);
    older.last_seen = Some(now - time::Duration::days(30));
    let mut newer = hypothesis("newer", 0.7, &["b"]);
    newer.last_seen = Some(now - time::Duration::days(1));
    let unseen = hypothesis("unseen", 0.7, &["c"]);

    let mut hypotheses = vec![unseen, older, newer];
    rank(&mut hypotheses);
    let order = hypotheses
        .iter()
        .map(|hypothesis| hypothesis.description.as_str())
        .collect::<Vec<_>>();
    assert_eq!(order, vec!["newer", "older", "unseen"]);
}

#[test]
fn given_confidence_differs_when_ranked_then_confidence_dominates_evidence() {
    let mut hypotheses = vec![
        hypothesis("weak but detailed", 0.55, &["a", "b", "c", "d"]),
        hypothesis("strong", 0.9, &[]),
    ];
    rank(&mut hypotheses);
    assert_eq!(hypotheses[0].description, "strong");
}

#[test]
fn given_shared_evidence_when_checked_then_no_competition() {
    let mut hypotheses = vec![
        hypothesis("pool exhausted", 0.9, &["Pool wait time"]),
        hypothesis("slow queries", 0.8, &["pool wait time ", "slow log"]),
    ];
    assert!(!mark_competing(&mut hypotheses, 0.7));
    assert!(hypotheses.iter().all(|hypothesis| !hypothesis.competing));
}

#[test]
fn given_disjoint_evidence_below_acceptance_when_checked_then_no_competition() {
    let mut hypotheses = vec![
        hypothesis("accepted", 0.9, &["x"]),
        hypothesis("rejected", 0.5, &["y"]),
    ];
    assert!(!mark_competing(&mut hypotheses, 0.7));
}

#[test]
fn given_duplicate_descriptions_when_merged_then_one_hypothesis_keeps_the_max_confidence() {
    let mut historical = hypothesis("Disk Full", 0.6, &["a"]);
    historical.source = HypothesisSource::Historical;
    let reasoned = hypothesis("disk full", 0.8, &["a", "b"]);

    let merged = merge(vec![historical], vec![reasoned]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].confidence.value(), 0.8);
    assert_eq!(merged[0].evidence, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(merged[0].source, HypothesisSource::Corroborated);
}
