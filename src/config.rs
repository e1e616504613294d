//! Runtime configuration read from the environment.

use std::env;
use std::path::PathBuf;
use tracing::warn;

pub const DATA_DIR_VAR: &str = "MEDBOOK_DATA_DIR";
pub const LOG_VAR: &str = "MEDBOOK_LOG";
pub const RECENT_LIMIT_VAR: &str = "MEDBOOK_RECENT_LIMIT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding one JSON file per store slot.
    pub data_dir: PathBuf,
    /// `tracing` filter directive.
    pub log_filter: String,
    /// How many appointments the admin "recent" view shows.
    pub recent_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: PathBuf::from("./medbook-data"),
            log_filter: "info".to_string(),
            recent_limit: 10,
        }
    }
}

/// A variable that was set but could not be used.
///
/// Collected while the config is built and logged by the caller once a
/// subscriber is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub var: &'static str,
    pub value: String,
    pub fallback: String,
}

impl ConfigWarning {
    pub fn log(&self) {
        warn!(
            value = %self.value,
            default = %self.fallback,
            "ignoring invalid {}", self.var
        );
    }
}

impl AppConfig {
    pub fn from_env() -> (Self, Vec<ConfigWarning>) {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup. Unset or blank
    /// variables keep their defaults; an unparsable limit keeps its default
    /// and is reported as a warning.
    pub fn from_lookup<F>(lookup: F) -> (Self, Vec<ConfigWarning>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();
        let mut warnings = Vec::new();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get(DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(filter) = get(LOG_VAR) {
            config.log_filter = filter.trim().to_string();
        }
        if let Some(raw) = get(RECENT_LIMIT_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => config.recent_limit = limit,
                _ => warnings.push(ConfigWarning {
                    var: RECENT_LIMIT_VAR,
                    value: raw,
                    fallback: config.recent_limit.to_string(),
                }),
            }
        }

        (config, warnings)
    }
}
