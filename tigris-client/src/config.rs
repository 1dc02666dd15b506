//! Client configuration

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::error::TigrisError;
use crate::retry::RetryPolicy;

/// Default endpoint of the Tigris object storage service
pub const DEFAULT_ENDPOINT: &str = "https://fly.storage.tigris.dev";

/// Region every request is signed for
pub const DEFAULT_REGION: &str = "auto";

/// Main configuration structure
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_region")]
    pub region: String,

    pub access_key_id: String,

    pub secret_access_key: String,

    #[serde(default)]
    pub retry: RetrySettings,

    /// Per-attempt HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Retry settings for the bucket API, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        RetryPolicy {
            max_attempts: settings.max_attempts,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    3_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    /// Configuration with explicit credentials and every other value at its
    /// default
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            endpoint: default_endpoint(),
            region: default_region(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            retry: RetrySettings::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Load configuration from file and environment.
    ///
    /// Lowest to highest precedence: `AWS_ACCESS_KEY_ID` /
    /// `AWS_SECRET_ACCESS_KEY`, an optional `tigris.*` file, then `TIGRIS_*`
    /// variables (`TIGRIS_RETRY__MAX_ATTEMPTS` for nested keys).
    pub fn load() -> Result<Self, TigrisError> {
        let mut builder = config::Config::builder();
        for (key, var) in [
            ("access_key_id", "AWS_ACCESS_KEY_ID"),
            ("secret_access_key", "AWS_SECRET_ACCESS_KEY"),
        ] {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_default(key, value)?;
            }
        }

        let config = builder
            .add_source(config::File::with_name("tigris").required(false))
            .add_source(config::Environment::with_prefix("TIGRIS").separator("__"))
            .build()?;

        let config = config.try_deserialize::<ClientConfig>()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no request could succeed with
    pub fn validate(&self) -> Result<(), TigrisError> {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(TigrisError::Config(
                "access key id and secret access key are required".to_string(),
            ));
        }

        let endpoint =
            url::Url::parse(&self.endpoint).map_err(|source| TigrisError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.host_str().is_none() {
            return Err(TigrisError::Config(format!(
                "endpoint must be an absolute http(s) URL: {}",
                self.endpoint
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(TigrisError::Config("retry.max_attempts must be at least 1".to_string()));
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.into()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("retry", &self.retry)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
