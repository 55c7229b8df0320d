use std::{cmp::Ordering, collections::BTreeSet, sync::Arc};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    diagnosis::{
        error::DiagnosisError,
        ports::HistoricalPatternPort,
        types::{
            Diagnosis, DiagnosisSource, DiagnosisStatus, HistoricalMatch, HypothesisSource,
            RootCauseHypothesis,
        },
    },
    gate::PolicyConfig,
    reasoning::{
        BoundedReasoner, ReasoningError, ReasoningErrorKind, ReasoningQuery, ReasoningStage,
        StageBudget,
        error::schema_mismatch,
        schema::{decode, output_schema},
    },
    types::{Confidence, Incident},
};

const DIAGNOSIS_INSTRUCTION: &str = "You diagnose operational incidents. Propose the most likely \
root causes, each with its own confidence between 0 and 1 and the evidence that supports it. \
Prior incidents with confirmed causes are included in the context.";

const UNDETERMINED: &str = "root cause undetermined";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HypothesisDraft {
    pub description: String,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagnosisVerdict {
    pub hypotheses: Vec<HypothesisDraft>,
}

#[derive(Clone)]
pub struct DiagnosticCorrelator {
    reasoner: BoundedReasoner,
    history: Arc<dyn HistoricalPatternPort>,
    policy: Arc<PolicyConfig>,
}

impl DiagnosticCorrelator {
    pub fn new(
        reasoner: BoundedReasoner,
        history: Arc<dyn HistoricalPatternPort>,
        policy: Arc<PolicyConfig>,
    ) -> Self {
        Self {
            reasoner,
            history,
            policy,
        }
    }

    /// Ranks root-cause hypotheses from history and reasoning.
    ///
    /// An inconclusive result is a normal return value, not an error. An error
    /// means reasoning failed and no fallback applies.
    pub async fn diagnose(
        &self,
        incident: &Incident,
        budget: &StageBudget,
    ) -> Result<Diagnosis, DiagnosisError> {
        let history = match self
            .history
            .lookup(incident.category, &incident.affected_systems)
            .await
        {
            Ok(history) => history,
            Err(err) => {
                tracing::warn!(
                    target: "diagnosis",
                    incident_id = %incident.id,
                    error = %err,
                    "history_lookup_failed"
                );
                Vec::new()
            }
        };

        let query = ReasoningQuery {
            incident_id: incident.id.clone(),
            stage: ReasoningStage::Diagnosis,
            instruction: DIAGNOSIS_INSTRUCTION.to_string(),
            context: json!({
                "incident": {
                    "description": incident.description,
                    "category": incident.category,
                    "severity": incident.severity,
                    "affected_systems": incident.affected_systems,
                    "symptoms": incident.symptoms,
                },
                "prior_incidents": history,
            }),
            schema: output_schema::<DiagnosisVerdict>(),
        };

        let reasoned = self.reasoner.invoke(&query, budget).await.and_then(|outcome| {
            let attempts = outcome.attempts;
            decode::<DiagnosisVerdict>(outcome.result)
                .and_then(|verdict| reasoned_hypotheses(verdict, outcome.confidence))
                .map(|hypotheses| (hypotheses, attempts))
                .map_err(|err| err.with_attempts(attempts))
        });

        let (reasoned, source, attempts) = match reasoned {
            Ok((hypotheses, attempts)) => (hypotheses, DiagnosisSource::Correlated, attempts),
            Err(err)
                if self.policy.fallback_on_failure
                    && !matches!(err.kind, ReasoningErrorKind::Cancelled)
                    && !budget.is_expired() =>
            {
                tracing::warn!(
                    target: "diagnosis",
                    incident_id = %incident.id,
                    error = %err,
                    history_matches = history.len(),
                    "diagnosis_history_fallback"
                );
                (Vec::new(), DiagnosisSource::HistoryOnly, err.attempts)
            }
            Err(err) => return Err(DiagnosisError::from_reasoning(err)),
        };

        let mut hypotheses = merge(historical_hypotheses(history), reasoned);
        rank(&mut hypotheses);

        let thresholds = self.policy.thresholds_for(incident.severity);
        let conflict = mark_competing(&mut hypotheses, thresholds.medium);

        let best = hypotheses
            .first()
            .map(|hypothesis| hypothesis.confidence.value());
        let status = match best {
            Some(best) if best >= thresholds.low => DiagnosisStatus::Conclusive,
            _ => DiagnosisStatus::Inconclusive,
        };
        if hypotheses.is_empty() {
            hypotheses.push(RootCauseHypothesis {
                description: UNDETERMINED.to_string(),
                confidence: Confidence::ZERO,
                evidence: Vec::new(),
                source: HypothesisSource::Placeholder,
                last_seen: None,
                recommended_actions: Vec::new(),
                competing: false,
            });
        }

        Ok(Diagnosis {
            hypotheses,
            status,
            conflict,
            source,
            attempts,
        })
    }
}

fn reasoned_hypotheses(
    verdict: DiagnosisVerdict,
    response_confidence: Confidence,
) -> Result<Vec<RootCauseHypothesis>, ReasoningError> {
    verdict
        .hypotheses
        .into_iter()
        .filter(|draft| !draft.description.trim().is_empty())
        .map(|draft| {
            let confidence = Confidence::new(draft.confidence).map_err(|err| {
                schema_mismatch(format!("hypothesis '{}': {err}", draft.description))
            })?;
            Ok(RootCauseHypothesis {
                description: draft.description.trim().to_string(),
                confidence: confidence.min(response_confidence),
                evidence: draft.evidence,
                source: HypothesisSource::Reasoning,
                last_seen: None,
                recommended_actions: draft.recommended_actions,
                competing: false,
            })
        })
        .collect()
}

fn historical_hypotheses(history: Vec<HistoricalMatch>) -> Vec<RootCauseHypothesis> {
    history
        .into_iter()
        .map(|matched| RootCauseHypothesis {
            description: matched.hypothesis,
            confidence: matched.confidence,
            evidence: matched.evidence,
            source: HypothesisSource::Historical,
            last_seen: Some(matched.observed_at),
            recommended_actions: matched.actions,
            competing: false,
        })
        .collect()
}

fn same_cause(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

/// Folds duplicates (same description, case-insensitive) into one hypothesis.
/// A reasoning hypothesis that repeats a historical one corroborates it.
pub fn merge(
    historical: Vec<RootCauseHypothesis>,
    reasoned: Vec<RootCauseHypothesis>,
) -> Vec<RootCauseHypothesis> {
    let mut merged: Vec<RootCauseHypothesis> = Vec::new();
    for candidate in historical.into_iter().chain(reasoned) {
        let Some(existing) = merged
            .iter_mut()
            .find(|existing| same_cause(&existing.description, &candidate.description))
        else {
            merged.push(candidate);
            continue;
        };

        if existing.source != candidate.source {
            existing.source = HypothesisSource::Corroborated;
        }
        existing.confidence = existing.confidence.max(candidate.confidence);
        for evidence in candidate.evidence {
            if !existing.evidence.contains(&evidence) {
                existing.evidence.push(evidence);
            }
        }
        for action in candidate.recommended_actions {
            if !existing.recommended_actions.contains(&action) {
                existing.recommended_actions.push(action);
            }
        }
        existing.last_seen = match (existing.last_seen, candidate.last_seen) {
            (Some(left), Some(right)) => Some(left.max(right)),
            (left, right) => left.or(right),
        };
    }
    merged
}

/// Confidence descending, then evidence count descending, then most recent
/// historical match first. Hypotheses never seen before sort last among ties.
pub fn rank(hypotheses: &mut [RootCauseHypothesis]) {
    hypotheses.sort_by(|left, right| {
        right
            .confidence
            .value()
            .total_cmp(&left.confidence.value())
            .then_with(|| right.evidence.len().cmp(&left.evidence.len()))
            .then_with(|| match (left.last_seen, right.last_seen) {
                (Some(left), Some(right)) => right.cmp(&left),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
}

/// Flags accepted hypotheses whose evidence is disjoint from another accepted
/// hypothesis. Returns whether any conflict was found.
pub fn mark_competing(hypotheses: &mut [RootCauseHypothesis], acceptance: f64) -> bool {
    let accepted = hypotheses
        .iter()
        .enumerate()
        .filter(|(_, hypothesis)| hypothesis.confidence.value() >= acceptance)
        .map(|(index, hypothesis)| {
            (
                index,
                hypothesis
                    .evidence
                    .iter()
                    .map(|evidence| evidence.trim().to_ascii_lowercase())
                    .collect::<BTreeSet<_>>(),
            )
        })
        .collect::<Vec<_>>();

    let mut competing = BTreeSet::new();
    for (position, (left_index, left_evidence)) in accepted.iter().enumerate() {
        for (right_index, right_evidence) in accepted.iter().skip(position + 1) {
            if left_evidence.is_disjoint(right_evidence) {
                competing.insert(*left_index);
                competing.insert(*right_index);
            }
        }
    }

    for index in &competing {
        hypotheses[*index].competing = true;
    }
    !competing.is_empty()
}
