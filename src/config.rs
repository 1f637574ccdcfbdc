//! Application-level configuration loading.
//!
//! Values come from a JSON file, then individual environment variables override them.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_LIVE_CONFIG_PATH";

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
const DEFAULT_MONGO_DB: &str = "quiz_live";

/// Where quizzes and game records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Some(Self::Mongo),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub mongo_uri: String,
    pub mongo_db: String,
    /// Countdown between `game_started` and the first question.
    pub start_delay: Duration,
    /// How long the intermediate scoreboard stays on screen.
    pub results_delay: Duration,
    /// Upper bound for saving a game record.
    pub save_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            store: StoreBackend::Mongo,
            mongo_uri: DEFAULT_MONGO_URI.into(),
            mongo_db: DEFAULT_MONGO_DB.into(),
            start_delay: Duration::from_millis(2_000),
            results_delay: Duration::from_millis(5_000),
            save_timeout: Duration::from_millis(5_000),
        }
    }
}

impl AppConfig {
    /// Load the configuration file, falling back to built-in defaults, then apply the
    /// environment overrides.
    pub fn load() -> Self {
        let mut config = Self::from_file();
        config.apply_env(|key| env::var(key).ok());
        config
    }

    fn from_file() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Override fields from `PORT`/`SERVER_PORT`, `MONGO_URI`, `MONGO_DB` and `STORE_BACKEND`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("SERVER_PORT").or_else(|| lookup("PORT")) {
            match raw.trim().parse() {
                Ok(port) => self.port = port,
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid port"),
            }
        }
        if let Some(uri) = lookup("MONGO_URI").filter(|value| !value.trim().is_empty()) {
            self.mongo_uri = uri;
        }
        if let Some(db) = lookup("MONGO_DB").filter(|value| !value.trim().is_empty()) {
            self.mongo_db = db;
        }
        if let Some(raw) = lookup("STORE_BACKEND") {
            match StoreBackend::parse(&raw) {
                Some(store) => self.store = store,
                None => warn!(value = %raw, "ignoring unknown store backend"),
            }
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    port: u16,
    store: StoreBackend,
    mongo_uri: String,
    mongo_db: String,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "start_delay_ms")]
    start_delay: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "results_delay_ms")]
    results_delay: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "save_timeout_ms")]
    save_timeout: Duration,
}

impl Default for RawConfig {
    fn default() -> Self {
        let defaults = AppConfig::default();
        Self {
            port: defaults.port,
            store: defaults.store,
            mongo_uri: defaults.mongo_uri,
            mongo_db: defaults.mongo_db,
            start_delay: defaults.start_delay,
            results_delay: defaults.results_delay,
            save_timeout: defaults.save_timeout,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            port: value.port,
            store: value.store,
            mongo_uri: value.mongo_uri,
            mongo_db: value.mongo_db,
            start_delay: value.start_delay,
            results_delay: value.results_delay,
            save_timeout: value.save_timeout,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "results_delay_ms": 1500, "store": "memory" }"#).unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.results_delay, Duration::from_millis(1_500));
        assert_eq!(config.start_delay, Duration::from_millis(2_000));
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.port, 3001);
    }

    #[test]
    fn env_overrides_win_over_the_file() {
        let vars = HashMap::from([
            ("PORT", "4000"),
            ("MONGO_URI", "mongodb://db:27017"),
            ("STORE_BACKEND", "memory"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.port, 4000);
        assert_eq!(config.mongo_uri, "mongodb://db:27017");
        assert_eq!(config.mongo_db, "quiz_live");
        assert_eq!(config.store, StoreBackend::Memory);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let vars = HashMap::from([("SERVER_PORT", "not-a-port"), ("STORE_BACKEND", "redis")]);
        let mut config = AppConfig::default();
        config.apply_env(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.port, 3001);
        assert_eq!(config.store, StoreBackend::Mongo);
    }
}
