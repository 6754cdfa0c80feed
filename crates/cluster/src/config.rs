//! Client configuration loaded from the environment.
//!
//! | Variable                    | Default                  | Description                                  |
//! |-----------------------------|--------------------------|----------------------------------------------|
//! | `ACE_API_URL`               | `http://localhost:3000`  | Cluster-management API base URL              |
//! | `ACE_NATS_URL`              | `nats://localhost:4222`  | Progress transport URL                       |
//! | `ACE_CONNECTION_NAME`       | `ace-cli`                | Connection name announced to NATS            |
//! | `ACE_CONNECT_TIMEOUT_SECS`  | `10`                     | Connect and subscribe-confirmation timeout   |
//! | `ACE_PROGRESS_TIMEOUT_SECS` | `1800`                   | Bound on waiting for the job to finish       |
//! | `ACE_CANCEL_GRACE_SECS`     | `5`                      | Wait for the subscriber after cancelling     |

use std::time::Duration;

use ace_core::subjects::DEFAULT_CONNECTION_NAME;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PROGRESS_TIMEOUT_SECS: u64 = 30 * 60;
pub const DEFAULT_CANCEL_GRACE_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got '{value}'")]
    InvalidSeconds { var: &'static str, value: String },
}

/// Everything needed to reach the control plane and follow progress.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub nats_url: String,
    pub connection_name: String,
    pub connect_timeout: Duration,
    pub progress_timeout: Duration,
    pub cancel_grace: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            nats_url: DEFAULT_NATS_URL.to_string(),
            connection_name: DEFAULT_CONNECTION_NAME.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            progress_timeout: Duration::from_secs(DEFAULT_PROGRESS_TIMEOUT_SECS),
            cancel_grace: Duration::from_secs(DEFAULT_CANCEL_GRACE_SECS),
        }
    }
}

impl ClientConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let seconds = |var: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            let Some(value) = lookup(var) else {
                return Ok(default);
            };
            let parsed = value.trim().parse::<u64>();
            parsed
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidSeconds { var, value })
        };

        Ok(Self {
            api_url: lookup("ACE_API_URL").unwrap_or(defaults.api_url),
            nats_url: lookup("ACE_NATS_URL").unwrap_or(defaults.nats_url),
            connection_name: lookup("ACE_CONNECTION_NAME").unwrap_or(defaults.connection_name),
            connect_timeout: seconds("ACE_CONNECT_TIMEOUT_SECS", defaults.connect_timeout)?,
            progress_timeout: seconds("ACE_PROGRESS_TIMEOUT_SECS", defaults.progress_timeout)?,
            cancel_grace: seconds("ACE_CANCEL_GRACE_SECS", defaults.cancel_grace)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.nats_url, DEFAULT_NATS_URL);
        assert_eq!(config.connection_name, "ace-cli");
        assert_eq!(config.progress_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("ACE_API_URL", "https://api.example.com"),
            ("ACE_PROGRESS_TIMEOUT_SECS", "90"),
            ("ACE_CANCEL_GRACE_SECS", " 1 "),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.progress_timeout, Duration::from_secs(90));
        assert_eq!(config.cancel_grace, Duration::from_secs(1));
    }

    #[test]
    fn invalid_seconds_are_rejected() {
        let result = ClientConfig::from_lookup(lookup(&[("ACE_CONNECT_TIMEOUT_SECS", "soon")]));
        assert_matches!(
            result,
            Err(ConfigError::InvalidSeconds { var: "ACE_CONNECT_TIMEOUT_SECS", .. })
        );
    }
}
