use crate::types::{Category, RiskLevel};

/// Hand-off used when no safe automated fallback exists.
pub const HANDOFF_ACTION: &str = "notify_oncall";

const CATALOG: [(&str, RiskLevel); 24] = [
    ("monitor", RiskLevel::Low),
    ("investigate_routing", RiskLevel::Low),
    ("rotate_logs", RiskLevel::Low),
    ("rerun_backup", RiskLevel::Low),
    ("verify_backup_storage", RiskLevel::Low),
    ("memory_cleanup", RiskLevel::Low),
    ("restart_service", RiskLevel::Low),
    ("notify_oncall", RiskLevel::Low),
    ("scale_resources", RiskLevel::Medium),
    ("kill_runaway_process", RiskLevel::Medium),
    ("cleanup_storage", RiskLevel::Medium),
    ("expand_volume", RiskLevel::Medium),
    ("optimize_network", RiskLevel::Medium),
    ("kill_blocking_queries", RiskLevel::Medium),
    ("optimize_queries", RiskLevel::Medium),
    ("restart_database", RiskLevel::High),
    ("reroute_traffic", RiskLevel::High),
    ("rollback_deployment", RiskLevel::High),
    ("isolate_host", RiskLevel::High),
    ("rotate_credentials", RiskLevel::High),
    ("restore_from_backup", RiskLevel::High),
    ("block_ip_range", RiskLevel::High),
    ("failover_database", RiskLevel::Critical),
    ("failover_region", RiskLevel::Critical),
];

pub fn normalize_action_name(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

pub fn lookup(name: &str) -> Option<RiskLevel> {
    let name = normalize_action_name(name);
    CATALOG
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, risk)| *risk)
}

/// Declared risk of an action type. Actions outside the catalog count as high risk.
pub fn action_risk(name: &str) -> RiskLevel {
    lookup(name).unwrap_or(RiskLevel::High)
}

pub fn known_actions() -> impl Iterator<Item = (&'static str, RiskLevel)> {
    CATALOG.iter().copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playbook {
    pub primary: &'static str,
    pub fallbacks: &'static [&'static str],
}

/// Default response per category, used to derive fallbacks and as the
/// deterministic plan when planning reasoning is unavailable.
pub fn playbook(category: Category) -> Playbook {
    match category {
        Category::Cpu => Playbook {
            primary: "scale_resources",
            fallbacks: &["kill_runaway_process", "monitor"],
        },
        Category::Memory => Playbook {
            primary: "memory_cleanup",
            fallbacks: &["restart_service", "scale_resources"],
        },
        Category::Disk => Playbook {
            primary: "cleanup_storage",
            fallbacks: &["rotate_logs", "expand_volume"],
        },
        Category::Network => Playbook {
            primary: "investigate_routing",
            fallbacks: &["optimize_network", "reroute_traffic"],
        },
        Category::DatabasePerformance => Playbook {
            primary: "kill_blocking_queries",
            fallbacks: &["optimize_queries", "restart_database"],
        },
        Category::ApplicationPerformance => Playbook {
            primary: "restart_service",
            fallbacks: &["rollback_deployment", "scale_resources"],
        },
        Category::Security => Playbook {
            primary: "isolate_host",
            fallbacks: &["rotate_credentials", "block_ip_range"],
        },
        Category::BackupFailure => Playbook {
            primary: "rerun_backup",
            fallbacks: &["verify_backup_storage"],
        },
        Category::Other => Playbook {
            primary: "monitor",
            fallbacks: &[],
        },
    }
}
