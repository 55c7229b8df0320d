use std::sync::LazyLock;

use regex::Regex;

static SYSTEM_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:prod|staging|dev|test)-[a-z0-9][a-z0-9-]*|(?:db|app|web|api|server|node|cluster)-[a-z0-9][a-z0-9-]*)\b",
    )
    .ok()
});

const SYMPTOM_KEYWORDS: [&str; 9] = [
    "slow", "timeout", "error", "fail", "crash", "hang", "freeze", "lag", "delay",
];

const ACTIONABLE_KEYWORDS: [&str; 21] = [
    "disk",
    "cpu",
    "memory",
    "database",
    "storage",
    "connectivity",
    "latency",
    "timeout",
    "performance",
    "kubernetes",
    "pod",
    "network",
    "failure",
    "incident",
    "outage",
    "production",
    "server",
    "resource",
    "degradation",
    "error",
    "cloud",
];

/// System identifiers such as `prod-db-01` or `api-gateway` mentioned in free text.
pub fn extract_systems(text: &str) -> Vec<String> {
    let Some(pattern) = SYSTEM_PATTERN.as_ref() else {
        return Vec::new();
    };
    let mut systems = Vec::new();
    for found in pattern.find_iter(text) {
        let system = found.as_str().to_ascii_lowercase();
        if !systems.contains(&system) {
            systems.push(system);
        }
    }
    systems
}

/// Symptom keywords in the order they are declared, each at most once.
pub fn extract_symptoms(text: &str) -> Vec<String> {
    let lowered = text.to_ascii_lowercase();
    SYMPTOM_KEYWORDS
        .iter()
        .filter(|keyword| lowered.contains(*keyword))
        .map(|keyword| keyword.to_string())
        .collect()
}

pub fn looks_actionable(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    ACTIONABLE_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
        || !extract_systems(text).is_empty()
}
