use std::{collections::BTreeMap, sync::Arc};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    diagnosis::Diagnosis,
    gate::PolicyConfig,
    planner::{
        catalog::{self, HANDOFF_ACTION},
        error::{PlanningError, PlanningErrorKind},
        types::{PlanSource, RemediationAction, RemediationPlan},
    },
    reasoning::{
        BoundedReasoner, ReasoningErrorKind, ReasoningQuery, ReasoningStage, StageBudget,
        schema::{decode, output_schema},
    },
    types::{Confidence, Incident, RiskLevel},
};

const PLANNING_INSTRUCTION: &str = "You plan incident remediation. Choose one primary action and \
ordered fallback actions from the catalog when possible. Your confidence is the feasibility of \
the plan given the root-cause hypotheses, not the certainty of the diagnosis.";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActionDraft {
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanVerdict {
    pub primary_action: ActionDraft,
    #[serde(default)]
    pub fallback_actions: Vec<ActionDraft>,
    #[serde(default)]
    pub rationale: Option<String>,
}

#[derive(Clone)]
pub struct ResponsePlanner {
    reasoner: BoundedReasoner,
    policy: Arc<PolicyConfig>,
}

impl ResponsePlanner {
    pub fn new(reasoner: BoundedReasoner, policy: Arc<PolicyConfig>) -> Self {
        Self { reasoner, policy }
    }

    pub async fn plan(
        &self,
        incident: &Incident,
        classification_confidence: Confidence,
        diagnosis: &Diagnosis,
        budget: &StageBudget,
    ) -> Result<RemediationPlan, PlanningError> {
        let triggering = diagnosis.triggering();
        if triggering.is_empty() {
            return Err(PlanningError::new(
                PlanningErrorKind::NoHypothesis,
                "diagnosis produced no hypothesis to plan for",
            ));
        }

        let query = ReasoningQuery {
            incident_id: incident.id.clone(),
            stage: ReasoningStage::Planning,
            instruction: PLANNING_INSTRUCTION.to_string(),
            context: json!({
                "incident": {
                    "description": incident.description,
                    "category": incident.category,
                    "severity": incident.severity,
                    "affected_systems": incident.affected_systems,
                },
                "hypotheses": triggering,
                "catalog": catalog::known_actions()
                    .map(|(name, risk)| json!({"name": name, "risk": risk}))
                    .collect::<Vec<_>>(),
            }),
            schema: output_schema::<PlanVerdict>(),
        };

        let reasoned = self.reasoner.invoke(&query, budget).await.and_then(|outcome| {
            let attempts = outcome.attempts;
            decode::<PlanVerdict>(outcome.result)
                .map(|verdict| (verdict, outcome.confidence, attempts))
                .map_err(|err| err.with_attempts(attempts))
        });

        let draft = match reasoned {
            Ok((verdict, feasibility, attempts)) => PlanDraft {
                primary: to_action(verdict.primary_action),
                fallbacks: verdict.fallback_actions.into_iter().map(to_action).collect(),
                feasibility,
                source: PlanSource::Reasoning,
                rationale: verdict.rationale,
                attempts,
            },
            Err(err)
                if self.policy.fallback_on_failure
                    && !matches!(err.kind, ReasoningErrorKind::Cancelled)
                    && !budget.is_expired() =>
            {
                tracing::warn!(
                    target: "planner",
                    incident_id = %incident.id,
                    error = %err,
                    "planning_catalog_fallback"
                );
                let book = catalog::playbook(incident.category);
                PlanDraft {
                    primary: catalog_action(book.primary),
                    fallbacks: Vec::new(),
                    feasibility: self.policy.fallback_confidence(),
                    source: PlanSource::Catalog,
                    rationale: Some(format!(
                        "default {} playbook; reasoning unavailable",
                        incident.category
                    )),
                    attempts: err.attempts,
                }
            }
            Err(err) => return Err(PlanningError::from_reasoning(err)),
        };

        Ok(assemble(
            incident,
            diagnosis,
            classification_confidence,
            draft,
            &self.policy,
        ))
    }
}

/// Plan content before fallback derivation and confidence composition.
#[derive(Debug, Clone)]
pub struct PlanDraft {
    pub primary: RemediationAction,
    pub fallbacks: Vec<RemediationAction>,
    pub feasibility: Confidence,
    pub source: PlanSource,
    pub rationale: Option<String>,
    pub attempts: u32,
}

fn to_action(draft: ActionDraft) -> RemediationAction {
    let name = catalog::normalize_action_name(&draft.name);
    RemediationAction {
        risk: catalog::action_risk(&name),
        name,
        parameters: draft
            .parameters
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect(),
    }
}

fn catalog_action(name: &str) -> RemediationAction {
    RemediationAction {
        name: name.to_string(),
        risk: catalog::action_risk(name),
        parameters: BTreeMap::new(),
    }
}

fn is_safe_fallback(primary: &RemediationAction, candidate: &RemediationAction) -> bool {
    candidate.name != primary.name && candidate.risk < RiskLevel::Critical
}

/// Derives fallbacks and composes the plan confidence.
///
/// Fallback candidates, in order: proposed fallbacks, actions recommended by
/// the triggering hypotheses, then the category playbook. Without any safe
/// fallback the primary risk goes up one tier and an on-call hand-off is appended.
pub fn assemble(
    incident: &Incident,
    diagnosis: &Diagnosis,
    classification_confidence: Confidence,
    draft: PlanDraft,
    policy: &PolicyConfig,
) -> RemediationPlan {
    let triggering = diagnosis.triggering();
    let mut primary = draft.primary;

    let book = catalog::playbook(incident.category);
    let candidates = draft
        .fallbacks
        .into_iter()
        .chain(
            triggering
                .iter()
                .flat_map(|hypothesis| hypothesis.recommended_actions.iter())
                .map(|name| catalog_action(&catalog::normalize_action_name(name))),
        )
        .chain(
            std::iter::once(book.primary)
                .chain(book.fallbacks.iter().copied())
                .map(catalog_action),
        );

    let mut fallbacks: Vec<RemediationAction> = Vec::new();
    for candidate in candidates {
        if candidate.name.is_empty()
            || candidate.name == primary.name
            || fallbacks.iter().any(|existing| existing.name == candidate.name)
        {
            continue;
        }
        fallbacks.push(candidate);
    }

    let has_safe_fallback = fallbacks
        .iter()
        .any(|candidate| is_safe_fallback(&primary, candidate));
    let risk_escalated = !has_safe_fallback;
    if risk_escalated {
        primary.risk = primary.risk.escalated();
        let handoff = if primary.name == HANDOFF_ACTION {
            "monitor"
        } else {
            HANDOFF_ACTION
        };
        if !fallbacks.iter().any(|existing| existing.name == handoff) {
            fallbacks.push(catalog_action(handoff));
        }
    }

    let hypothesis_confidence = triggering
        .iter()
        .map(|hypothesis| hypothesis.confidence)
        .fold(Confidence::ZERO, Confidence::max);
    let upstream = classification_confidence.min(hypothesis_confidence);
    let confidence = policy
        .plan_confidence_rule
        .combine(upstream, draft.feasibility)
        .min(hypothesis_confidence);

    RemediationPlan {
        risk: primary.risk,
        primary,
        fallbacks,
        confidence,
        feasibility: draft.feasibility,
        risk_escalated,
        triggering_hypotheses: triggering
            .iter()
            .map(|hypothesis| hypothesis.description.clone())
            .collect(),
        source: draft.source,
        rationale: draft.rationale,
        attempts: draft.attempts,
    }
}
