use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::capabilities::{HttpError, NetworkPolicy, ValidatedUrl, MAX_TIMEOUT_MS};

pub const ENV_ENDPOINT: &str = "DERMSCAN_ENDPOINT";
pub const ENV_TIMEOUT_MS: &str = "DERMSCAN_TIMEOUT_MS";
pub const ENV_ALLOW_PRIVATE_HOSTS: &str = "DERMSCAN_ALLOW_PRIVATE_HOSTS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] HttpError),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Raw configuration as the shell provides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub endpoint: String,
    /// `None` waits for the transport's own default.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default = "default_allow_private_hosts")]
    pub allow_private_hosts: bool,
}

fn default_allow_private_hosts() -> bool {
    true
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout_ms: None,
            allow_private_hosts: default_allow_private_hosts(),
        }
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = Some(timeout_ms);
        self
    }

    #[must_use]
    pub fn public_hosts_only(mut self) -> Self {
        self.allow_private_hosts = false;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint = lookup(ENV_ENDPOINT)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_ENDPOINT))?;
        let mut config = Self::new(endpoint);

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let ms = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                key: ENV_TIMEOUT_MS,
                reason: e.to_string(),
            })?;
            config.request_timeout_ms = Some(ms);
        }

        if let Some(raw) = lookup(ENV_ALLOW_PRIVATE_HOSTS) {
            config.allow_private_hosts = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError::Invalid {
                        key: ENV_ALLOW_PRIVATE_HOSTS,
                        reason: format!("expected a boolean, got '{other}'"),
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let policy = if self.allow_private_hosts {
            NetworkPolicy::AllowPrivate
        } else {
            NetworkPolicy::PublicOnly
        };
        let endpoint = ValidatedUrl::with_policy(self.endpoint.clone(), policy)?;

        let request_timeout = match self.request_timeout_ms {
            None => None,
            Some(ms) if (1..=MAX_TIMEOUT_MS).contains(&ms) => Some(Duration::from_millis(ms)),
            Some(ms) => {
                return Err(ConfigError::Invalid {
                    key: "request_timeout_ms",
                    reason: format!("{ms} is outside 1..={MAX_TIMEOUT_MS}"),
                })
            }
        };

        Ok(ResolvedConfig {
            endpoint,
            request_timeout,
        })
    }
}

/// Validated configuration the controller runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub endpoint: ValidatedUrl,
    pub request_timeout: Option<Duration>,
}

impl TryFrom<ClientConfig> for ResolvedConfig {
    type Error = ConfigError;

    fn try_from(config: ClientConfig) -> Result<Self, Self::Error> {
        config.resolve()
    }
}
