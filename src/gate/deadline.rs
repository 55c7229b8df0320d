use std::time::Duration;

use time::OffsetDateTime;

use crate::{gate::policy::PolicyConfig, types::Severity};

/// How long a routed incident may wait for a human before the silence is
/// itself reported as an escalation event.
pub fn human_response_window(policy: &PolicyConfig, severity: Severity) -> Duration {
    policy.tier(severity).human_response_window
}

pub fn human_response_deadline(
    policy: &PolicyConfig,
    severity: Severity,
    decided_at: OffsetDateTime,
) -> OffsetDateTime {
    let window = human_response_window(policy, severity);
    decided_at.saturating_add(time::Duration::seconds(window.as_secs() as i64))
}
