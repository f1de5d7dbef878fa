use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime configuration for the inventory service.
///
/// Deserializable so a host can load it from its own config file; every
/// field falls back to the documented default when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Bound on per-item lock acquisition before `Timeout`.
    pub lock_timeout_ms: u64,
    /// How far ahead lot expirations raise `caducidad` alerts.
    pub expiration_horizon_days: i64,
    /// Interval of the background alert sweep.
    pub sweep_interval_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            expiration_horizon_days: 7,
            sweep_interval_ms: 300_000,
        }
    }
}

impl ServiceConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: ServiceConfig = serde_json::from_str(r#"{"lock_timeout_ms": 100}"#).unwrap();
        assert_eq!(config.lock_timeout(), Duration::from_millis(100));
        assert_eq!(config.expiration_horizon_days, 7);
        assert_eq!(config.sweep_interval_ms, 300_000);
    }
}
