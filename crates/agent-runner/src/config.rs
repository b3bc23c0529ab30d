//! Engine configuration

use std::str::FromStr;
use std::time::Duration;

use psscript_core::agent::DEFAULT_MODEL;

/// Configuration for the run engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a run may wait on the model gateway
    pub run_timeout: Duration,
    /// Model assigned to agents created without one
    pub default_model: String,
    /// Interval between reads while waiting on a run
    pub poll_interval: Duration,
    /// Buffered run events per subscriber
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            run_timeout: Duration::from_secs(30),
            default_model: DEFAULT_MODEL.to_string(),
            poll_interval: Duration::from_millis(100),
            event_capacity: 256,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|raw| raw.trim().parse().ok())
}

impl EngineConfig {
    /// Read overrides from `PSSCRIPT_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through `lookup`; unset or unparsable values keep defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(secs) = parse_var(&lookup, "PSSCRIPT_RUN_TIMEOUT_SECS") {
            config.run_timeout = Duration::from_secs(secs);
        }
        if let Some(model) = lookup("PSSCRIPT_DEFAULT_MODEL").filter(|m| !m.trim().is_empty()) {
            config.default_model = model.trim().to_string();
        }
        if let Some(millis) = parse_var::<u64>(&lookup, "PSSCRIPT_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(millis.max(1));
        }

        config
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}
