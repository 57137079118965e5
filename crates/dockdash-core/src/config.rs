use std::env;
use std::time::Duration;

/// Tunables for a single in-place replacement
#[derive(Debug, Clone)]
pub struct ReplaceConfig {
    /// Grace period given to the old container before it is killed
    pub stop_timeout: Duration,
    /// How long a freshly started container has to reach `running`
    pub verify_timeout: Duration,
    /// Delay between two liveness polls
    pub verify_interval: Duration,
    /// Number of log lines attached to a failed verification
    pub log_tail_lines: usize,
}

impl Default for ReplaceConfig {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(30),
            verify_timeout: Duration::from_secs(6),
            verify_interval: Duration::from_millis(500),
            log_tail_lines: 50,
        }
    }
}

impl ReplaceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset, malformed or zero
    /// durations fall back to the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let positive = |key: &str| -> Option<u64> {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .filter(|n: &u64| *n > 0)
        };

        Self {
            stop_timeout: lookup("DOCKDASH_STOP_TIMEOUT")
                .and_then(|t| t.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.stop_timeout),
            verify_timeout: positive("DOCKDASH_VERIFY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.verify_timeout),
            verify_interval: positive("DOCKDASH_VERIFY_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.verify_interval),
            log_tail_lines: lookup("DOCKDASH_LOG_TAIL")
                .and_then(|n| n.trim().parse().ok())
                .unwrap_or(defaults.log_tail_lines),
        }
    }

    /// Stop timeout in whole seconds, as the engine API expects it
    pub fn stop_timeout_secs(&self) -> i64 {
        self.stop_timeout.as_secs() as i64
    }
}
