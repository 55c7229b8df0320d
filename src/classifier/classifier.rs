use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    classifier::{error::ClassifierError, impact::assess_business_impact},
    intake::IncidentDraft,
    reasoning::{
        BoundedReasoner, ReasoningQuery, ReasoningStage, StageBudget,
        schema::{decode, output_schema},
    },
    types::{Category, Confidence, Incident, IncidentStatus, Severity},
};

const CLASSIFICATION_INSTRUCTION: &str = "You classify operational incidents. Pick the single \
best category and a severity (low, medium, high, critical). List affected systems and \
symptoms you can identify, and summarize the business impact in one sentence.";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationVerdict {
    /// One of: cpu, memory, disk, network, database_performance,
    /// application_performance, security, backup_failure, other.
    pub category: String,
    pub severity: Severity,
    #[serde(default)]
    pub affected_systems: Vec<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub business_impact: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Explicit,
    Reasoning,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub incident: Incident,
    pub confidence: Confidence,
    pub source: ClassificationSource,
    pub attempts: u32,
}

#[derive(Clone)]
pub struct Classifier {
    reasoner: BoundedReasoner,
}

impl Classifier {
    pub fn new(reasoner: BoundedReasoner) -> Self {
        Self { reasoner }
    }

    /// Explicit category and severity are trusted as-is at confidence 1.0.
    /// Otherwise the reasoning capability fills the gaps; supplied fields still win.
    pub async fn classify(
        &self,
        draft: &IncidentDraft,
        budget: &StageBudget,
    ) -> Result<Classification, ClassifierError> {
        if let (Some(category), Some(severity)) = (draft.explicit_category, draft.explicit_severity)
        {
            return Ok(Classification {
                incident: build_incident(draft, category, severity, Vec::new(), Vec::new(), None),
                confidence: Confidence::CERTAIN,
                source: ClassificationSource::Explicit,
                attempts: 0,
            });
        }

        let query = ReasoningQuery {
            incident_id: draft.id.clone(),
            stage: ReasoningStage::Classification,
            instruction: CLASSIFICATION_INSTRUCTION.to_string(),
            context: json!({
                "description": draft.description,
                "affected_systems": draft.affected_systems,
                "symptoms": draft.symptoms,
                "metadata": draft.metadata,
                "supplied": {
                    "category": draft.explicit_category,
                    "severity": draft.explicit_severity,
                },
                "allowed_categories": Category::ALL.iter().map(|category| category.as_str()).collect::<Vec<_>>(),
            }),
            schema: output_schema::<ClassificationVerdict>(),
        };

        let outcome = self
            .reasoner
            .invoke(&query, budget)
            .await
            .map_err(ClassifierError::from_reasoning)?;
        let attempts = outcome.attempts;
        let verdict: ClassificationVerdict = decode(outcome.result)
            .map_err(|err| ClassifierError::from_reasoning(err.with_attempts(attempts)))?;

        let category = draft
            .explicit_category
            .or_else(|| Category::parse(&verdict.category))
            .unwrap_or(Category::Other);
        let severity = draft.explicit_severity.unwrap_or(verdict.severity);

        Ok(Classification {
            incident: build_incident(
                draft,
                category,
                severity,
                verdict.affected_systems,
                verdict.symptoms,
                verdict.business_impact,
            ),
            confidence: outcome.confidence,
            source: ClassificationSource::Reasoning,
            attempts,
        })
    }

    /// Default classification used when classification failed and fallback is enabled.
    pub fn fallback(draft: &IncidentDraft, confidence: Confidence) -> Classification {
        let category = draft.explicit_category.unwrap_or(Category::Other);
        let severity = draft.explicit_severity.unwrap_or(Severity::Medium);
        Classification {
            incident: build_incident(draft, category, severity, Vec::new(), Vec::new(), None),
            confidence,
            source: ClassificationSource::Fallback,
            attempts: 0,
        }
    }
}

fn build_incident(
    draft: &IncidentDraft,
    category: Category,
    severity: Severity,
    inferred_systems: Vec<String>,
    inferred_symptoms: Vec<String>,
    impact_summary: Option<String>,
) -> Incident {
    let mut affected_systems = draft.affected_systems.clone();
    affected_systems.extend(
        inferred_systems
            .into_iter()
            .map(|system| system.trim().to_string())
            .filter(|system| !system.is_empty()),
    );

    let mut symptoms = draft.symptoms.clone();
    for symptom in inferred_symptoms {
        let symptom = symptom.trim().to_string();
        if !symptom.is_empty() && !symptoms.contains(&symptom) {
            symptoms.push(symptom);
        }
    }

    let business_impact =
        assess_business_impact(severity, &affected_systems, &draft.metadata, impact_summary);

    Incident {
        id: draft.id.clone(),
        description: draft.description.clone(),
        category,
        severity,
        affected_systems,
        symptoms,
        metadata: draft.metadata.clone(),
        business_impact,
        status: IncidentStatus::Classified,
        received_at: draft.received_at,
    }
}
