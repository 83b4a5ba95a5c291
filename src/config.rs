use crate::handlers::SubmissionMode;
use log::{info, warn};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:nps_poll.db";
pub const DEFAULT_DEVICE_FILE: &str = ".nps_user_id";
pub const DEFAULT_REFRESH_MS: &str = "1000";

#[derive(Debug, Error)]
#[error("invalid value for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub submission_mode: SubmissionMode,
    pub device_file: PathBuf,
    pub refresh: Duration,
}

impl Config {
    /// Reads settings from the environment (and `.env`, loaded by `main`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| env::var(key).ok())
    }

    fn load<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let refresh_ms: u64 = try_load(&lookup, "NPS_REFRESH_MS", DEFAULT_REFRESH_MS)?;
        if refresh_ms == 0 {
            return Err(ConfigError {
                key: "NPS_REFRESH_MS",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            database_url: try_load(&lookup, "DATABASE_URL", DEFAULT_DATABASE_URL)?,
            submission_mode: try_load(&lookup, "NPS_SUBMISSION_MODE", "normal")?,
            device_file: try_load(&lookup, "NPS_DEVICE_FILE", DEFAULT_DEVICE_FILE)?,
            refresh: Duration::from_millis(refresh_ms),
        })
    }
}

fn try_load<L, T>(lookup: &L, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError {
            key,
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::load(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.submission_mode, SubmissionMode::Normal);
        assert_eq!(config.device_file, PathBuf::from(DEFAULT_DEVICE_FILE));
        assert_eq!(config.refresh, Duration::from_millis(1000));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = load(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("NPS_SUBMISSION_MODE", "unrestricted"),
            ("NPS_DEVICE_FILE", "/tmp/nps/id"),
            ("NPS_REFRESH_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.submission_mode, SubmissionMode::Unrestricted);
        assert_eq!(config.device_file, PathBuf::from("/tmp/nps/id"));
        assert_eq!(config.refresh, Duration::from_millis(250));
    }

    #[test]
    fn bad_values_name_their_key() {
        let err = load(&[("NPS_SUBMISSION_MODE", "chaos")]).unwrap_err();
        assert_eq!(err.key, "NPS_SUBMISSION_MODE");

        let err = load(&[("NPS_REFRESH_MS", "soon")]).unwrap_err();
        assert_eq!(err.key, "NPS_REFRESH_MS");

        let err = load(&[("NPS_REFRESH_MS", "0")]).unwrap_err();
        assert_eq!(err.key, "NPS_REFRESH_MS");
    }
}
