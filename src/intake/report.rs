use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    intake::{
        error::{IntakeError, empty_report, invalid_report},
        hints::{extract_symptoms, extract_systems, looks_actionable},
    },
    types::{Category, IncidentId, Severity},
};

/// Incident payload as it arrives: free text, or an incident-shaped record
/// whose fields are all optional except `description`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncidentReport {
    RawText(String),
    Structured(StructuredReport),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredReport {
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default)]
    pub affected_systems: Vec<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Normalized intake result, ready for classification.
#[derive(Debug, Clone)]
pub struct IncidentDraft {
    pub id: IncidentId,
    pub description: String,
    pub explicit_category: Option<Category>,
    pub explicit_severity: Option<Severity>,
    pub affected_systems: BTreeSet<String>,
    pub symptoms: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub actionable: bool,
    pub structured: bool,
    pub received_at: OffsetDateTime,
}

impl IncidentReport {
    /// Reads one intake line. JSON is tried first; anything that is not a JSON
    /// object or string is taken as free text.
    pub fn parse(line: &str) -> Result<Self, IntakeError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(empty_report("incident report is empty"));
        }

        let report = match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Object(_)) => Self::from_value(value)?,
            Ok(Value::String(text)) => IncidentReport::RawText(text),
            _ => IncidentReport::RawText(trimmed.to_string()),
        };
        report.validate()?;
        Ok(report)
    }

    pub fn from_value(value: Value) -> Result<Self, IntakeError> {
        let report = match value {
            Value::String(text) => IncidentReport::RawText(text),
            Value::Object(_) => IncidentReport::Structured(
                serde_json::from_value::<StructuredReport>(value)
                    .map_err(|err| invalid_report(format!("malformed incident report: {err}")))?,
            ),
            other => {
                return Err(invalid_report(format!(
                    "incident report must be text or an object, got {other}"
                )));
            }
        };
        report.validate()?;
        Ok(report)
    }

    pub fn description(&self) -> &str {
        match self {
            IncidentReport::RawText(text) => text,
            IncidentReport::Structured(report) => &report.description,
        }
    }

    fn validate(&self) -> Result<(), IntakeError> {
        if self.description().trim().is_empty() {
            return Err(empty_report("incident description is empty"));
        }
        Ok(())
    }

    pub fn into_draft(self, received_at: OffsetDateTime) -> IncidentDraft {
        match self {
            IncidentReport::RawText(text) => draft_from_text(text, received_at),
            IncidentReport::Structured(report) => draft_from_structured(report, received_at),
        }
    }
}

fn generate_incident_id() -> IncidentId {
    format!("INC-{}", Uuid::now_v7())
}

fn draft_from_text(text: String, received_at: OffsetDateTime) -> IncidentDraft {
    let description = text.trim().to_string();
    IncidentDraft {
        id: generate_incident_id(),
        affected_systems: extract_systems(&description).into_iter().collect(),
        symptoms: extract_symptoms(&description),
        actionable: looks_actionable(&description),
        explicit_category: None,
        explicit_severity: None,
        metadata: BTreeMap::new(),
        structured: false,
        description,
        received_at,
    }
}

fn draft_from_structured(report: StructuredReport, received_at: OffsetDateTime) -> IncidentDraft {
    let description = report.description.trim().to_string();
    let mut metadata = report
        .metadata
        .into_iter()
        .map(|(key, value)| (key, stringify(value)))
        .collect::<BTreeMap<_, _>>();
    for (key, value) in report.extra {
        metadata.entry(key).or_insert_with(|| stringify(value));
    }

    let explicit_category = report.category.as_deref().and_then(|raw| {
        let parsed = Category::parse(raw);
        if parsed.is_none() {
            metadata.insert("reported_category".to_string(), raw.to_string());
        }
        parsed
    });
    let explicit_severity = report.severity.as_deref().and_then(|raw| {
        let parsed = Severity::parse(raw);
        if parsed.is_none() {
            metadata.insert("reported_severity".to_string(), raw.to_string());
        }
        parsed
    });

    let mut affected_systems = report
        .affected_systems
        .into_iter()
        .map(|system| system.trim().to_string())
        .filter(|system| !system.is_empty())
        .collect::<BTreeSet<_>>();
    if affected_systems.is_empty() {
        affected_systems.extend(extract_systems(&description));
    }

    let mut symptoms = report
        .symptoms
        .into_iter()
        .map(|symptom| symptom.trim().to_string())
        .filter(|symptom| !symptom.is_empty())
        .collect::<Vec<_>>();
    if symptoms.is_empty() {
        symptoms = extract_symptoms(&description);
    }

    IncidentDraft {
        id: report
            .incident_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_incident_id),
        explicit_category,
        explicit_severity,
        affected_systems,
        symptoms,
        metadata,
        actionable: true,
        structured: true,
        description,
        received_at,
    }
}

fn stringify(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
