//! Configuration for IAM-authenticated cache connections.
//!
//! Provides [`EcAuthConfig`]. Values are loaded from environment variables, using the
//! same variable names as the AWS tooling where one exists (`AWS_REGION`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use typed_builder::TypedBuilder;

use crate::error::{EcAuthError, EcAuthResult};
use crate::types::{CacheVariant, Region};

/// Default cache port.
pub const DEFAULT_PORT: u16 = 6379;

/// Default IAM-enabled cache user id.
pub const DEFAULT_USER: &str = "iam-user";

/// Default connect and read timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Connection and authentication configuration.
///
/// # Examples
///
/// ```
/// use ecauth_core::EcAuthConfig;
///
/// let config = EcAuthConfig::default();
/// assert_eq!(config.port, 6379);
/// assert!(config.tls);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct EcAuthConfig {
    /// Cache endpoint hostname.
    #[builder(default)]
    pub endpoint: String,

    /// Cache port.
    #[builder(default = DEFAULT_PORT)]
    pub port: u16,

    /// IAM-enabled cache user id, sent unsigned as the AUTH username.
    #[builder(default = String::from(DEFAULT_USER))]
    pub user: String,

    /// Explicit resource name; bypasses hostname inference when set.
    #[builder(default)]
    pub cache_name: Option<String>,

    /// Variant hint; `None` infers the variant from the endpoint.
    #[builder(default)]
    pub variant: Option<CacheVariant>,

    /// Signing region.
    #[builder(default)]
    pub region: Region,

    /// Whether the transport should use TLS.
    #[builder(default = true)]
    pub tls: bool,

    /// Connect timeout in milliseconds.
    #[builder(default = DEFAULT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,

    /// Read (socket) timeout in milliseconds.
    #[builder(default = DEFAULT_TIMEOUT_MS)]
    pub read_timeout_ms: u64,

    /// Whether issued tokens may be reused until shortly before they expire.
    #[builder(default = false)]
    pub token_cache: bool,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for EcAuthConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            port: DEFAULT_PORT,
            user: String::from(DEFAULT_USER),
            cache_name: None,
            variant: None,
            region: Region::default(),
            tls: true,
            connect_timeout_ms: DEFAULT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            token_cache: false,
            log_level: String::from("info"),
        }
    }
}

impl EcAuthConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `ELASTICACHE_ENDPOINT` | *(empty)* |
    /// | `ELASTICACHE_PORT` | `6379` |
    /// | `ELASTICACHE_USER` | `iam-user` |
    /// | `ELASTICACHE_CACHE_NAME` | *(unset)* |
    /// | `ELASTICACHE_SERVERLESS` | *(unset, inferred)* |
    /// | `AWS_REGION` / `AWS_DEFAULT_REGION` | `us-east-1` |
    /// | `ELASTICACHE_TLS` | `true` |
    /// | `ELASTICACHE_CONNECT_TIMEOUT_MS` | `10000` |
    /// | `ELASTICACHE_READ_TIMEOUT_MS` | `10000` |
    /// | `ELASTICACHE_TOKEN_CACHE` | `false` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unparsable numeric or variant values are ignored with a warning and the
    /// default is kept.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("ELASTICACHE_ENDPOINT") {
            config.endpoint = v.trim().to_owned();
        }
        if let Some(v) = lookup("ELASTICACHE_PORT") {
            match v.trim().parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => warn!(value = %v, default = DEFAULT_PORT, "invalid port, using default"),
            }
        }
        if let Some(v) = lookup("ELASTICACHE_USER") {
            config.user = v;
        }
        if let Some(v) = lookup("ELASTICACHE_CACHE_NAME").filter(|v| !v.trim().is_empty()) {
            config.cache_name = Some(v.trim().to_owned());
        }
        if let Some(v) = lookup("ELASTICACHE_SERVERLESS") {
            match v.parse::<CacheVariant>() {
                Ok(variant) => config.variant = Some(variant),
                Err(e) => warn!(error = %e, "ignoring variant hint, inferring from endpoint"),
            }
        }
        if let Some(v) = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION")) {
            config.region = Region::new(v);
        }
        if let Some(v) = lookup("ELASTICACHE_TLS") {
            config.tls = parse_bool(&v);
        }
        if let Some(v) = lookup("ELASTICACHE_CONNECT_TIMEOUT_MS") {
            if let Ok(ms) = v.trim().parse::<u64>() {
                config.connect_timeout_ms = ms;
            }
        }
        if let Some(v) = lookup("ELASTICACHE_READ_TIMEOUT_MS") {
            if let Ok(ms) = v.trim().parse::<u64>() {
                config.read_timeout_ms = ms;
            }
        }
        if let Some(v) = lookup("ELASTICACHE_TOKEN_CACHE") {
            config.token_cache = parse_bool(&v);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Check that the fields required to sign a token are present.
    ///
    /// # Errors
    ///
    /// Returns [`EcAuthError::Config`] when the endpoint, user, or region is empty.
    pub fn validate(&self) -> EcAuthResult<()> {
        if self.endpoint.is_empty() {
            return Err(EcAuthError::Config("endpoint is not set".to_owned()));
        }
        if self.user.is_empty() {
            return Err(EcAuthError::Config("user is not set".to_owned()));
        }
        if self.region.is_empty() {
            return Err(EcAuthError::Config("region is not set".to_owned()));
        }
        Ok(())
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout as a [`Duration`].
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}
