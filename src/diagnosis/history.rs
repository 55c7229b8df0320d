use std::{collections::BTreeSet, fs, path::Path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    diagnosis::{
        error::{DiagnosisError, history_unavailable},
        ports::HistoricalPatternPort,
        types::HistoricalMatch,
    },
    types::{Category, Confidence},
};

#[derive(Debug, Clone, Default)]
pub struct NoopHistory;

#[async_trait]
impl HistoricalPatternPort for NoopHistory {
    async fn lookup(
        &self,
        _category: Category,
        _affected_systems: &BTreeSet<String>,
    ) -> Result<Vec<HistoricalMatch>, DiagnosisError> {
        Ok(Vec::new())
    }
}

/// A resolved incident as stored in the history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedIncident {
    pub category: Category,
    #[serde(default)]
    pub systems: Vec<String>,
    pub cause: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
}

/// History served from a fixed list of resolved incidents.
#[derive(Debug, Clone, Default)]
pub struct StaticHistory {
    incidents: Vec<ResolvedIncident>,
}

impl StaticHistory {
    pub fn new(incidents: Vec<ResolvedIncident>) -> Self {
        Self { incidents }
    }

    pub fn load(path: &Path) -> Result<Self, DiagnosisError> {
        let content = fs::read_to_string(path).map_err(|err| {
            history_unavailable(format!(
                "failed to read incident history '{}': {err}",
                path.display()
            ))
        })?;
        let incidents: Vec<ResolvedIncident> = json5::from_str(&content).map_err(|err| {
            history_unavailable(format!(
                "failed to parse incident history '{}': {err}",
                path.display()
            ))
        })?;
        Ok(Self::new(incidents))
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

#[async_trait]
impl HistoricalPatternPort for StaticHistory {
    async fn lookup(
        &self,
        category: Category,
        affected_systems: &BTreeSet<String>,
    ) -> Result<Vec<HistoricalMatch>, DiagnosisError> {
        let mut matches = self
            .incidents
            .iter()
            .filter(|incident| incident.category == category)
            .filter(|incident| {
                incident.systems.is_empty()
                    || affected_systems.is_empty()
                    || incident
                        .systems
                        .iter()
                        .any(|system| affected_systems.contains(system))
            })
            .map(|incident| HistoricalMatch {
                hypothesis: incident.cause.clone(),
                confidence: incident.confidence,
                evidence: incident.evidence.clone(),
                observed_at: incident.observed_at,
                actions: incident.actions.clone(),
            })
            .collect::<Vec<_>>();
        matches.sort_by(|left, right| right.observed_at.cmp(&left.observed_at));
        Ok(matches)
    }
}
