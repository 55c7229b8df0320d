use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Confidence, RiskLevel};

/// An opaque, named remediation operation with its declared blast radius.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationAction {
    pub name: String,
    pub risk: RiskLevel,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Reasoning,
    Catalog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub primary: RemediationAction,
    /// Tried in order when the primary action fails. Never empty.
    pub fallbacks: Vec<RemediationAction>,
    pub confidence: Confidence,
    pub feasibility: Confidence,
    pub risk: RiskLevel,
    pub risk_escalated: bool,
    pub triggering_hypotheses: Vec<String>,
    pub source: PlanSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default)]
    pub attempts: u32,
}

impl RemediationPlan {
    pub fn action_names(&self) -> Vec<&str> {
        std::iter::once(self.primary.name.as_str())
            .chain(self.fallbacks.iter().map(|action| action.name.as_str()))
            .collect()
    }
}
