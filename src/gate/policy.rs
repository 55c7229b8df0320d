use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    gate::error::PolicyConfigInvalid,
    types::{Confidence, RiskLevel, Severity},
};

fn default_low_threshold() -> f64 {
    0.5
}

fn default_medium_threshold() -> f64 {
    0.7
}

fn default_high_threshold() -> f64 {
    0.9
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_enabled_true() -> bool {
    true
}

fn default_fallback_confidence() -> f64 {
    0.5
}

fn default_autonomous_risk_ceiling() -> RiskLevel {
    RiskLevel::High
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct ConfidenceThresholds {
    #[serde(default = "default_low_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub low: f64,
    #[serde(default = "default_medium_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub medium: f64,
    #[serde(default = "default_high_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub high: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            low: default_low_threshold(),
            medium: default_medium_threshold(),
            high: default_high_threshold(),
        }
    }
}

impl ConfidenceThresholds {
    fn check_order(&self, scope: &str) -> Result<(), PolicyConfigInvalid> {
        if self.low < self.medium && self.medium < self.high {
            return Ok(());
        }
        Err(PolicyConfigInvalid::ThresholdOrder {
            scope: scope.to_string(),
            low: self.low,
            medium: self.medium,
            high: self.high,
        })
    }
}

/// Per-severity overrides as written in config. Unset fields take the tier default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct TierSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomous_execution: Option<bool>,
    /// At most one week.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 10080))]
    pub human_response_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub thresholds: Option<ConfidenceThresholds>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct SeverityTiers {
    #[serde(default)]
    #[validate(nested)]
    pub low: TierSettings,
    #[serde(default)]
    #[validate(nested)]
    pub medium: TierSettings,
    #[serde(default)]
    #[validate(nested)]
    pub high: TierSettings,
    #[serde(default)]
    #[validate(nested)]
    pub critical: TierSettings,
}

impl SeverityTiers {
    fn settings(&self, severity: Severity) -> &TierSettings {
        match severity {
            Severity::Low => &self.low,
            Severity::Medium => &self.medium,
            Severity::High => &self.high,
            Severity::Critical => &self.critical,
        }
    }

    fn settings_mut(&mut self, severity: Severity) -> &mut TierSettings {
        match severity {
            Severity::Low => &mut self.low,
            Severity::Medium => &mut self.medium,
            Severity::High => &mut self.high,
            Severity::Critical => &mut self.critical,
        }
    }
}

/// Resolved policy for one severity tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityTier {
    pub approval_required: bool,
    pub autonomous_execution: bool,
    pub human_response_window: Duration,
    pub thresholds: ConfidenceThresholds,
}

/// How plan confidence is derived from upstream confidence and plan feasibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceCombination {
    #[default]
    Minimum,
    Product,
}

impl ConfidenceCombination {
    pub fn combine(self, upstream: Confidence, feasibility: Confidence) -> Confidence {
        match self {
            ConfidenceCombination::Minimum => upstream.min(feasibility),
            ConfidenceCombination::Product => upstream.scaled_by(feasibility),
        }
    }
}

/// Process-wide decision policy. Loaded once, validated, then shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PolicyConfig {
    #[serde(default)]
    #[validate(nested)]
    pub thresholds: ConfidenceThresholds,
    #[serde(default)]
    #[validate(nested)]
    pub tiers: SeverityTiers,
    #[serde(default = "default_timeout_seconds")]
    #[validate(range(min = 1))]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_enabled_true")]
    pub fallback_on_failure: bool,
    #[serde(default = "default_fallback_confidence")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub fallback_confidence: f64,
    #[serde(default)]
    pub reject_non_actionable: bool,
    #[serde(default)]
    pub plan_confidence_rule: ConfidenceCombination,
    #[serde(default = "default_autonomous_risk_ceiling")]
    pub autonomous_risk_ceiling: RiskLevel,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            thresholds: ConfidenceThresholds::default(),
            tiers: SeverityTiers::default(),
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            fallback_on_failure: true,
            fallback_confidence: default_fallback_confidence(),
            reject_non_actionable: false,
            plan_confidence_rule: ConfidenceCombination::default(),
            autonomous_risk_ceiling: default_autonomous_risk_ceiling(),
        }
    }
}

impl PolicyConfig {
    /// Startup check. Any violation means the process must not start.
    pub fn validate_policy(&self) -> Result<(), PolicyConfigInvalid> {
        self.validate()?;
        self.thresholds.check_order("global")?;
        for severity in [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            if let Some(thresholds) = &self.tiers.settings(severity).thresholds {
                thresholds.check_order(severity.as_str())?;
            }
        }
        Ok(())
    }

    pub fn tier(&self, severity: Severity) -> SeverityTier {
        let settings = self.tiers.settings(severity);
        let (approval_required, autonomous_execution, minutes) = match severity {
            Severity::Low => (false, true, 30),
            Severity::Medium => (false, true, 15),
            Severity::High => (true, false, 5),
            Severity::Critical => (true, false, 0),
        };
        SeverityTier {
            approval_required: settings.approval_required.unwrap_or(approval_required),
            autonomous_execution: settings.autonomous_execution.unwrap_or(autonomous_execution),
            human_response_window: Duration::from_secs(
                settings
                    .human_response_minutes
                    .unwrap_or(minutes)
                    .saturating_mul(60),
            ),
            thresholds: settings.thresholds.unwrap_or(self.thresholds),
        }
    }

    pub fn thresholds_for(&self, severity: Severity) -> ConfidenceThresholds {
        self.tier(severity).thresholds
    }

    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn fallback_confidence(&self) -> Confidence {
        Confidence::new(self.fallback_confidence).unwrap_or(Confidence::ZERO)
    }

    pub fn tier_settings_mut(&mut self, severity: Severity) -> &mut TierSettings {
        self.tiers.settings_mut(severity)
    }
}
