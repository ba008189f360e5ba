use std::time::Duration;

use serde::Deserialize;

use crate::types::TransportFailurePolicy;

/// Public CircleCI API host used when `CIRCLECI_API_HOST` is not set.
pub const DEFAULT_CIRCLECI_API_HOST: &str = "https://circleci.com";

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Webhook used when a request does not name one (`SLACK_WEBHOOK`, then `WEBHOOK`)
    pub default_webhook: Option<String>,

    /// CircleCI token used when a request does not carry one
    pub circleci_token: Option<String>,

    /// Base URL of the CircleCI API (default: https://circleci.com)
    pub circleci_api_host: String,

    /// Seconds to wait between two status queries of the same build (default: 5)
    pub sleep_interval_secs: u64,

    /// Port the notification service listens on (default: 8080)
    pub port: u16,

    /// Register the template helper library (default: true)
    pub template_helpers: bool,

    /// Treat the CircleCI `failing` status as terminal (default: true)
    pub failing_is_terminal: bool,

    /// What a monitor does when the CI status endpoint cannot be reached
    pub transport_failure: TransportFailurePolicy,

    /// Upper bound on monitors polling at the same time. `None` means unbounded.
    pub max_active_monitors: Option<usize>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        Ok(Self {
            default_webhook: get("SLACK_WEBHOOK").or_else(|| get("WEBHOOK")),
            circleci_token: get("CIRCLECI_TOKEN"),
            circleci_api_host: get("CIRCLECI_API_HOST")
                .unwrap_or_else(|| DEFAULT_CIRCLECI_API_HOST.to_string()),
            sleep_interval_secs: get("SLEEP_INTERVAL_SECS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SLEEP_INTERVAL_SECS must be a valid u64"))?,
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid u16"))?,
            template_helpers: Self::template_helpers_from_lookup(&lookup)?,
            failing_is_terminal: parse_flag(
                "FAILING_IS_TERMINAL",
                get("FAILING_IS_TERMINAL"),
                true,
            )?,
            transport_failure: get("MONITOR_TRANSPORT_FAILURE")
                .map(|value| value.parse::<TransportFailurePolicy>())
                .transpose()
                .map_err(|e| anyhow::anyhow!("MONITOR_TRANSPORT_FAILURE: {}", e))?
                .unwrap_or_default(),
            max_active_monitors: get("MAX_ACTIVE_MONITORS")
                .map(|value| value.parse::<usize>())
                .transpose()
                .map_err(|_| anyhow::anyhow!("MAX_ACTIVE_MONITORS must be a valid usize"))?
                .filter(|limit| *limit > 0),
        })
    }

    /// Read only `TEMPLATE_HELPERS` (default: true). For callers that render
    /// messages but do not run the service.
    pub fn template_helpers_from_lookup<F>(lookup: F) -> anyhow::Result<bool>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = lookup("TEMPLATE_HELPERS").filter(|value| !value.is_empty());
        parse_flag("TEMPLATE_HELPERS", value, true)
    }

    /// Interval between two polls of a monitored build.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sleep_interval_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_webhook: None,
            circleci_token: None,
            circleci_api_host: DEFAULT_CIRCLECI_API_HOST.to_string(),
            sleep_interval_secs: 5,
            port: 8080,
            template_helpers: true,
            failing_is_terminal: true,
            transport_failure: TransportFailurePolicy::default(),
            max_active_monitors: None,
        }
    }
}

fn parse_flag(key: &str, value: Option<String>, default: bool) -> anyhow::Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(anyhow::anyhow!("{} must be a boolean, got '{}'", key, other)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.default_webhook, None);
        assert_eq!(config.circleci_token, None);
        assert_eq!(config.circleci_api_host, "https://circleci.com");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.port, 8080);
        assert!(config.template_helpers);
        assert!(config.failing_is_terminal);
        assert_eq!(config.transport_failure, TransportFailurePolicy::Abandon);
        assert_eq!(config.max_active_monitors, None);
    }

    #[test]
    fn test_slack_webhook_wins_over_webhook() {
        let config = config_from(&[
            ("WEBHOOK", "http://generic"),
            ("SLACK_WEBHOOK", "http://slack"),
        ])
        .unwrap();
        assert_eq!(config.default_webhook.as_deref(), Some("http://slack"));

        let config = config_from(&[("WEBHOOK", "http://generic")]).unwrap();
        assert_eq!(config.default_webhook.as_deref(), Some("http://generic"));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = config_from(&[("SLACK_WEBHOOK", ""), ("SLEEP_INTERVAL_SECS", "")]).unwrap();
        assert_eq!(config.default_webhook, None);
        assert_eq!(config.sleep_interval_secs, 5);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CIRCLECI_TOKEN", "dummy"),
            ("CIRCLECI_API_HOST", "http://localhost:8085"),
            ("SLEEP_INTERVAL_SECS", "1"),
            ("PORT", "8082"),
            ("TEMPLATE_HELPERS", "false"),
            ("FAILING_IS_TERMINAL", "0"),
            ("MONITOR_TRANSPORT_FAILURE", "notify"),
            ("MAX_ACTIVE_MONITORS", "16"),
        ])
        .unwrap();
        assert_eq!(config.circleci_token.as_deref(), Some("dummy"));
        assert_eq!(config.circleci_api_host, "http://localhost:8085");
        assert_eq!(config.sleep_interval_secs, 1);
        assert_eq!(config.port, 8082);
        assert!(!config.template_helpers);
        assert!(!config.failing_is_terminal);
        assert_eq!(config.transport_failure, TransportFailurePolicy::Notify);
        assert_eq!(config.max_active_monitors, Some(16));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("SLEEP_INTERVAL_SECS", "soon")]).is_err());
        assert!(config_from(&[("PORT", "99999")]).is_err());
        assert!(config_from(&[("TEMPLATE_HELPERS", "maybe")]).is_err());
        assert!(config_from(&[("MONITOR_TRANSPORT_FAILURE", "retry")]).is_err());
    }

    #[test]
    fn test_template_helpers_ignores_service_keys() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "tcp://10.0.0.5:8080"),
            ("SLEEP_INTERVAL_SECS", "soon"),
            ("TEMPLATE_HELPERS", "false"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| vars.get(key).map(|v| v.to_string());

        assert!(AppConfig::from_lookup(lookup).is_err());
        assert!(!AppConfig::template_helpers_from_lookup(lookup).unwrap());
        assert!(AppConfig::template_helpers_from_lookup(|_| None).unwrap());
        assert!(AppConfig::template_helpers_from_lookup(|_| Some("maybe".into())).is_err());
    }

    #[test]
    fn test_zero_monitor_limit_means_unbounded() {
        let config = config_from(&[("MAX_ACTIVE_MONITORS", "0")]).unwrap();
        assert_eq!(config.max_active_monitors, None);
    }
}
