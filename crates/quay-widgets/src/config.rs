//! Manager settings.

use crate::event::DEFAULT_SOURCE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default limit on a single widget update.
pub const DEFAULT_UPDATE_TIMEOUT_MS: u64 = 30_000;

/// Default period of `widget:periodicSync`.
pub const DEFAULT_PERIODIC_SYNC_MS: u64 = 30_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Per-widget update limit in milliseconds. `None` waits forever.
    pub update_timeout_ms: Option<u64>,
    pub periodic_sync_ms: u64,
    /// Source stamped on events whose payload names none.
    pub default_source: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            update_timeout_ms: Some(DEFAULT_UPDATE_TIMEOUT_MS),
            periodic_sync_ms: DEFAULT_PERIODIC_SYNC_MS,
            default_source: DEFAULT_SOURCE.to_string(),
        }
    }
}

impl ManagerConfig {
    pub fn update_timeout(&self) -> Option<Duration> {
        self.update_timeout_ms.map(Duration::from_millis)
    }

    pub fn periodic_sync_interval(&self) -> Duration {
        Duration::from_millis(self.periodic_sync_ms.max(1))
    }

    pub fn with_update_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.update_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ManagerConfig = serde_json::from_str(r#"{"update_timeout_ms": null}"#).unwrap();
        assert_eq!(config.update_timeout(), None);
        assert_eq!(config.periodic_sync_interval(), Duration::from_secs(30));
        assert_eq!(config.default_source, DEFAULT_SOURCE);
    }

    #[test]
    fn test_zero_sync_interval_is_clamped() {
        let config = ManagerConfig {
            periodic_sync_ms: 0,
            ..ManagerConfig::default()
        };
        assert_eq!(config.periodic_sync_interval(), Duration::from_millis(1));
    }
}
