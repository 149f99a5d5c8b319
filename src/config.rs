//! Runtime configuration
//!
//! Everything is read from environment variables with defaults suitable for a
//! local install.

use std::path::PathBuf;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

pub const DEFAULT_OFF_BASE_URL: &str = "https://world.openfoodfacts.org";
pub const DEFAULT_USDA_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_DIRECTIVE: &str = "macrolog=info";

/// Settings for the upstream food databases
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub off_base_url: String,
    pub usda_base_url: String,
    /// FoodData Central requires a key; searches fail without one
    pub usda_api_key: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            off_base_url: DEFAULT_OFF_BASE_URL.to_string(),
            usda_base_url: DEFAULT_USDA_BASE_URL.to_string(),
            usda_api_key: None,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            user_agent: format!(
                "{}/{} (meal logging)",
                crate::build_info::NAME,
                crate::build_info::VERSION
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub sources: SourcesConfig,
    /// Full filter string, e.g. `macrolog=debug,rmcp=warn`
    pub log_directive: String,
}

impl Config {
    /// Build configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = SourcesConfig::default();

        let timeout = match non_empty("MACROLOG_HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(
                        "Ignoring invalid MACROLOG_HTTP_TIMEOUT_SECS '{}', using {}s",
                        raw,
                        DEFAULT_HTTP_TIMEOUT_SECS
                    );
                    defaults.timeout
                }
            },
            None => defaults.timeout,
        };

        Self {
            database_path: non_empty("MACROLOG_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_database_path),
            sources: SourcesConfig {
                off_base_url: non_empty("MACROLOG_OFF_BASE_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.off_base_url),
                usda_base_url: non_empty("MACROLOG_USDA_BASE_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.usda_base_url),
                usda_api_key: non_empty("MACROLOG_USDA_API_KEY"),
                timeout,
                user_agent: defaults.user_agent,
            },
            log_directive: non_empty("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_DIRECTIVE.to_string()),
        }
    }

    /// Log filter for the subscriber; an unparsable `RUST_LOG` falls back to
    /// the default directive instead of stopping the server
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_directive).unwrap_or_else(|e| {
            eprintln!(
                "Ignoring invalid RUST_LOG '{}' ({}), using {}",
                self.log_directive, e, DEFAULT_LOG_DIRECTIVE
            );
            EnvFilter::new(DEFAULT_LOG_DIRECTIVE)
        })
    }
}

/// `data/macrolog.db` at the project root (or next to the executable)
pub fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("macrolog.db");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.sources.off_base_url, DEFAULT_OFF_BASE_URL);
        assert_eq!(config.sources.usda_base_url, DEFAULT_USDA_BASE_URL);
        assert_eq!(config.sources.usda_api_key, None);
        assert_eq!(config.sources.timeout, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        assert_eq!(config.log_directive, DEFAULT_LOG_DIRECTIVE);
        assert!(config.database_path.ends_with("data/macrolog.db"));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("MACROLOG_DATABASE_PATH", "/tmp/test.db"),
            ("MACROLOG_USDA_API_KEY", "abc"),
            ("MACROLOG_OFF_BASE_URL", "http://localhost:9000/"),
            ("MACROLOG_HTTP_TIMEOUT_SECS", "3"),
        ]);
        assert_eq!(config.database_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.sources.usda_api_key.as_deref(), Some("abc"));
        assert_eq!(config.sources.off_base_url, "http://localhost:9000");
        assert_eq!(config.sources.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_timeout_and_blank_key() {
        let config = config_from(&[
            ("MACROLOG_HTTP_TIMEOUT_SECS", "soon"),
            ("MACROLOG_USDA_API_KEY", "  "),
        ]);
        assert_eq!(config.sources.timeout, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        assert_eq!(config.sources.usda_api_key, None);
    }

    #[test]
    fn test_multi_target_log_filter() {
        let config = config_from(&[("RUST_LOG", "macrolog=debug,rmcp=warn")]);
        assert_eq!(config.log_directive, "macrolog=debug,rmcp=warn");
        assert!(EnvFilter::try_new(&config.log_directive).is_ok());

        let filter = config.env_filter().to_string();
        assert!(filter.contains("macrolog=debug"));
        assert!(filter.contains("rmcp=warn"));
    }

    #[test]
    fn test_invalid_log_filter_falls_back() {
        let config = config_from(&[("RUST_LOG", "macrolog=loud")]);
        assert!(EnvFilter::try_new(&config.log_directive).is_err());
        assert!(config.env_filter().to_string().contains("macrolog=info"));
    }
}
