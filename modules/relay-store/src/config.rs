use std::env;

use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;

pub const DEFAULT_MAX_CASCADE: usize = 1024;

/// Store configuration. Loaded from environment variables, all optional.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Tags every journal entry produced by this store.
    pub run_id: String,
    /// Upper bound on actions processed by one `dispatch`, derived ones
    /// included. Guards against bridge cycles.
    pub max_cascade: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            max_cascade: DEFAULT_MAX_CASCADE,
        }
    }
}

impl StoreConfig {
    /// Reads `RELAY_RUN_ID` and `RELAY_MAX_CASCADE`.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let mut config = Self::default();

        if let Some(run_id) = lookup("RELAY_RUN_ID").filter(|v| !v.trim().is_empty()) {
            config.run_id = run_id;
        }

        if let Some(raw) = lookup("RELAY_MAX_CASCADE") {
            let max_cascade: usize = raw.trim().parse().map_err(|_| {
                StoreError::Config(format!("RELAY_MAX_CASCADE must be a number, got {raw:?}"))
            })?;
            if max_cascade == 0 {
                return Err(StoreError::Config(
                    "RELAY_MAX_CASCADE must be at least 1".to_string(),
                ));
            }
            config.max_cascade = max_cascade;
        }

        Ok(config)
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_max_cascade(mut self, max_cascade: usize) -> Self {
        self.max_cascade = max_cascade;
        self
    }

    pub fn log(&self) {
        info!(
            run_id = self.run_id.as_str(),
            max_cascade = self.max_cascade,
            "Store config"
        );
    }
}
