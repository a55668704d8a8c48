use std::sync::Arc;
use std::time::Duration;

use berlin_ckan::Configuration as CkanConfiguration;
use url::Url;

use crate::analysis::{FreshnessThresholds, RelevanceWeights};
use crate::error::{OpenDataError, Result};

/// Environment variable overriding the CKAN action API root
pub const ENV_BASE_URL: &str = "BERLIN_CKAN_BASE_URL";
/// Environment variable overriding the user agent
pub const ENV_USER_AGENT: &str = "BERLIN_OPENDATA_USER_AGENT";
/// Environment variable overriding the per-call timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "BERLIN_OPENDATA_TIMEOUT_SECS";
/// Environment variable overriding the upper age bound of the `current` bucket
pub const ENV_FRESH_DAYS: &str = "BERLIN_OPENDATA_FRESH_DAYS";
/// Environment variable overriding the upper age bound of the `recent` bucket
pub const ENV_RECENT_DAYS: &str = "BERLIN_OPENDATA_RECENT_DAYS";

/// Configuration for the Berlin open data client
#[derive(Debug, Clone)]
pub struct OpenDataConfig {
    /// CKAN client configuration
    pub ckan_config: Arc<CkanConfiguration>,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Public portal used to build dataset links
    pub portal_url: String,
    /// Age boundaries of the freshness buckets
    pub freshness: FreshnessThresholds,
    /// Weights of the relevance score
    pub relevance: RelevanceWeights,
    /// Number of formats listed in catalog statistics
    pub top_formats: usize,
    /// Items requested per facet when computing statistics (`-1` for all)
    pub stats_facet_limit: i32,
}

impl Default for OpenDataConfig {
    fn default() -> Self {
        let user_agent = concat!("berlin-opendata-rs/", env!("CARGO_PKG_VERSION")).to_string();
        let timeout_secs = 30;
        let ckan_config = CkanConfiguration {
            user_agent: Some(user_agent.clone()),
            timeout: Some(Duration::from_secs(timeout_secs)),
            ..CkanConfiguration::default()
        };

        Self {
            ckan_config: Arc::new(ckan_config),
            user_agent,
            timeout_secs,
            portal_url: crate::PORTAL_URL.to_string(),
            freshness: FreshnessThresholds::default(),
            relevance: RelevanceWeights::default(),
            top_formats: 10,
            stats_facet_limit: -1,
        }
    }
}

impl OpenDataConfig {
    /// Create a new configuration for the Berlin registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `BERLIN_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// Unset or blank variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(url) = get(ENV_BASE_URL) {
            config = config.with_base_url(url)?;
        }
        if let Some(user_agent) = get(ENV_USER_AGENT) {
            config = config.with_user_agent(user_agent);
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            config = config.with_timeout(parse_positive(ENV_TIMEOUT_SECS, &secs)?);
        }

        let mut freshness = config.freshness;
        if let Some(days) = get(ENV_FRESH_DAYS) {
            freshness.current_days = parse_days(ENV_FRESH_DAYS, &days)?;
        }
        if let Some(days) = get(ENV_RECENT_DAYS) {
            freshness.recent_days = parse_days(ENV_RECENT_DAYS, &days)?;
        }
        config.with_freshness(freshness)
    }

    /// Point the client at another CKAN action API root
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url).map_err(|e| {
            OpenDataError::config_error(format!("invalid base URL '{base_url}': {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(OpenDataError::config_error(format!(
                "base URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let mut ckan_config = (*self.ckan_config).clone();
        ckan_config.base_path = base_url.trim_end_matches('/').to_string();
        self.ckan_config = Arc::new(ckan_config);
        Ok(self)
    }

    /// Set custom user agent
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        let mut ckan_config = (*self.ckan_config).clone();
        ckan_config.user_agent = Some(self.user_agent.clone());
        self.ckan_config = Arc::new(ckan_config);
        self
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs.max(1);
        let mut ckan_config = (*self.ckan_config).clone();
        ckan_config.timeout = Some(Duration::from_secs(self.timeout_secs));
        self.ckan_config = Arc::new(ckan_config);
        self
    }

    /// Set the freshness bucket boundaries
    pub fn with_freshness(mut self, freshness: FreshnessThresholds) -> Result<Self> {
        if freshness.current_days > freshness.recent_days {
            return Err(OpenDataError::config_error(format!(
                "freshness thresholds out of order: current ({}) > recent ({})",
                freshness.current_days, freshness.recent_days
            )));
        }
        self.freshness = freshness;
        Ok(self)
    }

    /// Set the relevance weights
    pub fn with_relevance(mut self, relevance: RelevanceWeights) -> Self {
        self.relevance = relevance;
        self
    }

    /// Set how many formats catalog statistics list
    pub fn with_top_formats(mut self, top_formats: usize) -> Self {
        self.top_formats = top_formats.max(1);
        self
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(OpenDataError::config_error(format!(
            "{key} must be a positive integer, got '{value}'"
        ))),
    }
}

fn parse_days(key: &str, value: &str) -> Result<i64> {
    let days = parse_positive(key, value)?;
    i64::try_from(days).map_err(|_| {
        OpenDataError::config_error(format!("{key} is too large, got '{value}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_target_berlin() {
        let config = OpenDataConfig::default();
        assert_eq!(config.ckan_config.base_path, "https://datenregister.berlin.de/api/3");
        assert_eq!(config.ckan_config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.top_formats, 10);
    }

    #[test]
    fn env_overrides_apply() {
        let config = OpenDataConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost:5000/api/3/"),
            (ENV_USER_AGENT, "tester/2.0"),
            (ENV_TIMEOUT_SECS, "12"),
            (ENV_FRESH_DAYS, "7"),
            (ENV_RECENT_DAYS, " 90 "),
        ]))
        .expect("valid environment");

        assert_eq!(config.ckan_config.base_path, "http://localhost:5000/api/3");
        assert_eq!(config.ckan_config.user_agent.as_deref(), Some("tester/2.0"));
        assert_eq!(config.timeout_secs, 12);
        assert_eq!(config.ckan_config.timeout, Some(Duration::from_secs(12)));
        assert_eq!(config.freshness.current_days, 7);
        assert_eq!(config.freshness.recent_days, 90);
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config = OpenDataConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "  ")]))
            .expect("blank is ignored");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let err = OpenDataConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert_eq!(err.kind(), "config");

        let err = OpenDataConfig::from_lookup(lookup(&[(ENV_BASE_URL, "ftp://example.org")])).unwrap_err();
        assert!(err.to_string().contains("http or https"));

        let err = OpenDataConfig::from_lookup(lookup(&[(ENV_FRESH_DAYS, "400")])).unwrap_err();
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn oversized_day_counts_do_not_wrap() {
        let err = OpenDataConfig::from_lookup(lookup(&[(ENV_RECENT_DAYS, "18446744073709551615")]))
            .unwrap_err();
        assert_eq!(err.kind(), "config");
        assert!(err.to_string().contains("too large"));

        let config = OpenDataConfig::from_lookup(lookup(&[(ENV_RECENT_DAYS, "9223372036854775807")]))
            .expect("i64::MAX fits");
        assert_eq!(config.freshness.recent_days, i64::MAX);
    }
}
