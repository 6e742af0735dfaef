//! Cache identity resolution from endpoint hostnames.
//!
//! One rule covers every endpoint shape:
//!
//! - The hostname is trimmed, lowercased and stripped of one trailing `.`. It must have
//!   at least two labels, none empty, made of `a-z`, `0-9` and inner `-`.
//! - **Serverless**: if a label equals `serverless`, the resource name is every label
//!   before it, joined with `.`
//!   (`cache-01-vk-yiy6se.serverless.euw1.cache.amazonaws.com` -> `cache-01-vk-yiy6se`).
//! - **Cluster**: the resource name is the first label, or the second one when the
//!   first is an endpoint role (`master`, `replica`, `clustercfg`), with a trailing
//!   shard/node suffix (`-NNNN-NNN` or `-NNN`) removed
//!   (`my-cluster-0001-001.abc123.0001.euw1.cache.amazonaws.com` -> `my-cluster`).
//!
//! Names the rule cannot derive are supplied explicitly with [`CacheIdentity::new`].

use std::sync::LazyLock;

use ecauth_core::{CacheVariant, Region};
use regex::Regex;
use tracing::debug;

use crate::error::TokenError;

/// Signing service name for every cache.
pub const SERVICE_NAME: &str = "elasticache";

/// Hostname label marking a serverless endpoint.
const SERVERLESS_LABEL: &str = "serverless";

/// First labels that name an endpoint role rather than the cache.
const ROLE_PREFIXES: &[&str] = &["master", "replica", "clustercfg"];

static NODE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+?)(?:-\d{4})?-\d{3}$").expect("node suffix pattern is valid")
});

/// The cache a token grants access to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheIdentity {
    name: String,
    region: Region,
    variant: CacheVariant,
}

impl CacheIdentity {
    /// Build an identity from an explicit resource name.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidEndpoint`] if `name` is empty or contains `/`, `?`,
    /// `&` or whitespace.
    pub fn new(
        name: impl Into<String>,
        region: Region,
        variant: CacheVariant,
    ) -> Result<Self, TokenError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TokenError::invalid_endpoint(name, "empty resource name"));
        }
        if name
            .chars()
            .any(|c| matches!(c, '/' | '?' | '&') || c.is_whitespace())
        {
            return Err(TokenError::invalid_endpoint(
                name,
                "resource name contains a reserved character",
            ));
        }
        Ok(Self {
            name,
            region,
            variant,
        })
    }

    /// The resource name, signed as the `host` header and prefixed to the token.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The signing region.
    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// The signing service name, always `elasticache`.
    #[must_use]
    pub fn service_name(&self) -> &'static str {
        SERVICE_NAME
    }

    /// The deployment variant.
    #[must_use]
    pub fn variant(&self) -> CacheVariant {
        self.variant
    }
}

/// Resolve the identity of the cache behind `hostname`.
///
/// With `hint = None` the variant is inferred (serverless iff a `serverless` label is
/// present); `Some(variant)` is used as given. The name rule is the same either way.
///
/// # Errors
///
/// Returns [`TokenError::InvalidEndpoint`] if the hostname has fewer than two labels,
/// an empty label, a character outside `a-z0-9-.`, or yields an empty name.
///
/// # Examples
///
/// ```
/// use ecauth_core::{CacheVariant, Region};
/// use ecauth_token::resolve_identity;
///
/// let identity = resolve_identity(
///     "cache-01-vk-yiy6se.serverless.euw1.cache.amazonaws.com",
///     Region::new("eu-west-1"),
///     None,
/// )
/// .unwrap();
/// assert_eq!(identity.name(), "cache-01-vk-yiy6se");
/// assert_eq!(identity.variant(), CacheVariant::ServerlessCache);
/// ```
pub fn resolve_identity(
    hostname: &str,
    region: Region,
    hint: Option<CacheVariant>,
) -> Result<CacheIdentity, TokenError> {
    let normalized = hostname.trim().to_ascii_lowercase();
    let normalized = normalized.strip_suffix('.').unwrap_or(&normalized);

    let labels: Vec<&str> = normalized.split('.').collect();
    validate_labels(hostname, &labels)?;

    let serverless_at = labels.iter().position(|label| *label == SERVERLESS_LABEL);
    let name = match serverless_at {
        Some(index) => labels[..index].join("."),
        None => cluster_name(&labels),
    };
    if name.is_empty() {
        return Err(TokenError::invalid_endpoint(hostname, "empty resource name"));
    }

    let variant = hint.unwrap_or(if serverless_at.is_some() {
        CacheVariant::ServerlessCache
    } else {
        CacheVariant::Cluster
    });

    debug!(cache = %name, variant = %variant, region = %region, "Resolved cache identity");

    CacheIdentity::new(name, region, variant)
}

fn validate_labels(hostname: &str, labels: &[&str]) -> Result<(), TokenError> {
    if labels.len() < 2 {
        return Err(TokenError::invalid_endpoint(
            hostname,
            "fewer than two labels",
        ));
    }
    for label in labels {
        if label.is_empty() {
            return Err(TokenError::invalid_endpoint(hostname, "empty label"));
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(TokenError::invalid_endpoint(
                hostname,
                format!("invalid character in label {label:?}"),
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(TokenError::invalid_endpoint(
                hostname,
                format!("label {label:?} starts or ends with '-'"),
            ));
        }
    }
    Ok(())
}

fn cluster_name(labels: &[&str]) -> String {
    let first = match labels {
        [role, next, _, ..] if ROLE_PREFIXES.contains(role) => next,
        [first, ..] => first,
        [] => return String::new(),
    };
    NODE_SUFFIX
        .captures(first)
        .and_then(|caps| caps.name("name"))
        .map_or_else(|| (*first).to_owned(), |m| m.as_str().to_owned())
}
