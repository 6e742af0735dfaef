//! Common type definitions shared across the ecauth crates.

use std::fmt;
use std::str::FromStr;

use crate::EcAuthError;

/// AWS Region identifier used as the signing region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Region(String);

impl Region {
    /// Region used when nothing else is configured.
    pub const DEFAULT: &str = "us-east-1";

    /// Create a new region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    /// Get the region as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the region is empty (never valid for signing).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Region {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deployment variant of a cache.
///
/// Serverless caches need an extra `ResourceType=ServerlessCache` parameter in the
/// signed connect request; traditional clusters do not.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
pub enum CacheVariant {
    /// A traditional (node-based) replication group or cluster.
    #[default]
    Cluster,
    /// A serverless cache.
    ServerlessCache,
}

impl CacheVariant {
    /// Whether this is the serverless variant.
    #[must_use]
    pub fn is_serverless(self) -> bool {
        matches!(self, Self::ServerlessCache)
    }

    /// Stable lowercase name, used in logs and JSON output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cluster => "cluster",
            Self::ServerlessCache => "serverless",
        }
    }
}

impl fmt::Display for CacheVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheVariant {
    type Err = EcAuthError;

    /// Accepts `cluster`/`serverless` as well as boolean spellings of "is serverless".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serverless" | "serverlesscache" | "true" | "1" => Ok(Self::ServerlessCache),
            "cluster" | "false" | "0" => Ok(Self::Cluster),
            other => Err(EcAuthError::Config(format!(
                "unrecognized cache variant: {other}"
            ))),
        }
    }
}
