use std::collections::{BTreeMap, BTreeSet};

use crate::types::{BusinessImpact, Criticality, Severity};

pub fn assess_business_impact(
    severity: Severity,
    affected_systems: &BTreeSet<String>,
    metadata: &BTreeMap<String, String>,
    summary: Option<String>,
) -> BusinessImpact {
    let touches_production = affected_systems
        .iter()
        .any(|system| system.to_ascii_lowercase().contains("prod"));

    let criticality = match severity {
        Severity::High | Severity::Critical => Criticality::Critical,
        _ if touches_production => Criticality::High,
        Severity::Medium => Criticality::Medium,
        Severity::Low => Criticality::Low,
    };
    let sla_target = if criticality == Criticality::Critical {
        "99.9% uptime required"
    } else {
        "99% uptime required"
    };

    BusinessImpact {
        criticality,
        sla_target: sla_target.to_string(),
        affected_users: metadata.get("affected_users").cloned(),
        summary: summary.filter(|text| !text.trim().is_empty()),
    }
}
