use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::Confidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisSource {
    Historical,
    Reasoning,
    Corroborated,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseHypothesis {
    pub description: String,
    pub confidence: Confidence,
    pub evidence: Vec<String>,
    pub source: HypothesisSource,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_seen: Option<OffsetDateTime>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    #[serde(default)]
    pub competing: bool,
}

/// A prior incident whose confirmed cause matches the current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMatch {
    pub hypothesis: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisStatus {
    Conclusive,
    Inconclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisSource {
    Correlated,
    HistoryOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Never empty; ranked best first.
    pub hypotheses: Vec<RootCauseHypothesis>,
    pub status: DiagnosisStatus,
    pub conflict: bool,
    pub source: DiagnosisSource,
    pub attempts: u32,
}

impl Diagnosis {
    pub fn top(&self) -> Option<&RootCauseHypothesis> {
        self.hypotheses.first()
    }

    pub fn best_confidence(&self) -> Confidence {
        self.top()
            .map(|hypothesis| hypothesis.confidence)
            .unwrap_or(Confidence::ZERO)
    }

    /// Hypotheses a plan has to address: the top one plus every competing one.
    pub fn triggering(&self) -> Vec<&RootCauseHypothesis> {
        self.hypotheses
            .iter()
            .enumerate()
            .filter(|(index, hypothesis)| *index == 0 || hypothesis.competing)
            .map(|(_, hypothesis)| hypothesis)
            .collect()
    }

    pub fn is_inconclusive(&self) -> bool {
        self.status == DiagnosisStatus::Inconclusive
    }
}
