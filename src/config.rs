use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{Language, Theme};

/// Application-level constants
pub const APP_NAME: &str = "Klinik CRM";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ITEMS_PER_PAGE: usize = 10;
pub const MOCK_API_DELAY_MS: u64 = 300;
pub const LOGIN_DELAY_MS: u64 = 500;
pub const SESSION_TTL_HOURS: i64 = 12;

pub const DEFAULT_CURRENCY: &str = "TRY";
pub const DEFAULT_LANGUAGE: Language = Language::Tr;
pub const DEFAULT_THEME: Theme = Theme::System;

pub const DEFAULT_BIND: &str = "127.0.0.1:8787";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "klinik=info"
}

/// Get the application data directory
/// ~/KlinikCRM/ when a home directory exists, ./KlinikCRM otherwise.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("KlinikCRM")
}

/// Runtime settings, overridable through `KLINIK_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicConfig {
    pub api_delay: Duration,
    pub login_delay: Duration,
    pub session_ttl: chrono::Duration,
    pub data_dir: PathBuf,
    pub bind: SocketAddr,
    pub seed_file: Option<PathBuf>,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            api_delay: Duration::from_millis(MOCK_API_DELAY_MS),
            login_delay: Duration::from_millis(LOGIN_DELAY_MS),
            session_ttl: chrono::Duration::hours(SESSION_TTL_HOURS),
            data_dir: app_data_dir(),
            bind: SocketAddr::from(([127, 0, 0, 1], 8787)),
            seed_file: None,
        }
    }
}

impl ClinicConfig {
    /// Zero latency everywhere; used by tests and bulk tooling.
    pub fn instant() -> Self {
        Self {
            api_delay: Duration::ZERO,
            login_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values fall back to the default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64>(&lookup, "KLINIK_API_DELAY_MS") {
            config.api_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "KLINIK_LOGIN_DELAY_MS") {
            config.login_delay = Duration::from_millis(ms);
        }
        if let Some(hours) = parse_var::<i64>(&lookup, "KLINIK_SESSION_TTL_HOURS") {
            config.session_ttl = chrono::Duration::hours(hours);
        }
        if let Some(addr) = parse_var::<SocketAddr>(&lookup, "KLINIK_BIND") {
            config.bind = addr;
        }
        if let Some(dir) = lookup("KLINIK_DATA_DIR").filter(|v| !v.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        config.seed_file = lookup("KLINIK_SEED_FILE")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_ends_with_app_folder() {
        assert!(app_data_dir().ends_with("KlinikCRM"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn defaults_match_constants() {
        let config = ClinicConfig::default();
        assert_eq!(config.api_delay, Duration::from_millis(300));
        assert_eq!(config.login_delay, Duration::from_millis(500));
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert!(config.seed_file.is_none());
    }

    #[test]
    fn environment_overrides() {
        let config = ClinicConfig::from_lookup(lookup(&[
            ("KLINIK_API_DELAY_MS", "0"),
            ("KLINIK_SESSION_TTL_HOURS", "1"),
            ("KLINIK_BIND", "0.0.0.0:9000"),
            ("KLINIK_DATA_DIR", "/tmp/klinik"),
            ("KLINIK_SEED_FILE", "seed.json"),
        ]));
        assert_eq!(config.api_delay, Duration::ZERO);
        assert_eq!(config.session_ttl, chrono::Duration::hours(1));
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/klinik"));
        assert_eq!(config.seed_file, Some(PathBuf::from("seed.json")));
    }

    #[test]
    fn bad_values_fall_back() {
        let config = ClinicConfig::from_lookup(lookup(&[("KLINIK_API_DELAY_MS", "soon")]));
        assert_eq!(config.api_delay, Duration::from_millis(MOCK_API_DELAY_MS));
    }
}
