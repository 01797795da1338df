//! Repository tuning knobs.

use crate::db::{clamp_busy_timeout, DEFAULT_BUSY_TIMEOUT};
use std::time::Duration;

/// Connection-level settings applied by `SqliteCustomerRepository`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoConfig {
    /// Upper bound for waiting on a locked database. Each call further
    /// clamps it to the context's remaining time. Values above
    /// `db::MAX_BUSY_TIMEOUT` are capped.
    pub busy_timeout: Duration,
    /// Deadline applied to calls whose context has none tighter.
    pub default_op_timeout: Option<Duration>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            default_op_timeout: None,
        }
    }
}

impl RepoConfig {
    /// `busy_timeout` capped at what SQLite can represent.
    pub fn effective_busy_timeout(&self) -> Duration {
        clamp_busy_timeout(self.busy_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::RepoConfig;
    use crate::db::{DEFAULT_BUSY_TIMEOUT, MAX_BUSY_TIMEOUT};
    use std::time::Duration;

    #[test]
    fn effective_busy_timeout_keeps_sane_values() {
        assert_eq!(
            RepoConfig::default().effective_busy_timeout(),
            DEFAULT_BUSY_TIMEOUT
        );
    }

    #[test]
    fn effective_busy_timeout_caps_huge_values() {
        let config = RepoConfig {
            busy_timeout: Duration::MAX,
            default_op_timeout: None,
        };
        assert_eq!(config.effective_busy_timeout(), MAX_BUSY_TIMEOUT);
    }
}
