//! Optional reuse of tokens across connection attempts.
//!
//! Tokens are keyed by access key id, cache identity (name, region and variant) and
//! user. A cached token is handed
//! out only while it is younger than `refresh_after` (720 s by default), so it always
//! has at least 180 s of its 900 s window left. Misses are filled while holding the map
//! entry, so concurrent misses for one key sign once. Failures are not cached.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ecauth_sigv4::Credentials;
use tracing::debug;

use crate::error::TokenError;
use crate::identity::CacheIdentity;
use crate::signer::TOKEN_EXPIRY_SECS;
use crate::token::{AuthToken, issue_token};

/// Default age after which a cached token is replaced.
pub const DEFAULT_REFRESH_AFTER: Duration = Duration::from_secs(720);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    access_key_id: String,
    identity: CacheIdentity,
    user: String,
}

/// A concurrent token cache.
#[derive(Debug)]
pub struct TokenCache {
    entries: DashMap<CacheKey, AuthToken>,
    refresh_after: chrono::Duration,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache {
    /// Create a cache refreshing tokens after [`DEFAULT_REFRESH_AFTER`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_refresh_after(DEFAULT_REFRESH_AFTER)
    }

    /// Create a cache refreshing tokens after `refresh_after`.
    ///
    /// Values at or beyond the token lifetime are clamped to one second short of it.
    #[must_use]
    pub fn with_refresh_after(refresh_after: Duration) -> Self {
        let max_secs = TOKEN_EXPIRY_SECS - 1;
        let secs = refresh_after.as_secs().min(max_secs);
        Self {
            entries: DashMap::new(),
            refresh_after: chrono::Duration::seconds(i64::try_from(secs).unwrap_or_default()),
        }
    }

    /// Age after which a cached token is replaced.
    #[must_use]
    pub fn refresh_after(&self) -> chrono::Duration {
        self.refresh_after
    }

    /// Return a fresh cached token or issue and cache a new one.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`issue_token`]. A failed refresh evicts the stale entry.
    pub fn get_or_issue(
        &self,
        identity: &CacheIdentity,
        user: &str,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> Result<AuthToken, TokenError> {
        let key = CacheKey {
            access_key_id: credentials.access_key_id().to_owned(),
            identity: identity.clone(),
            user: user.to_owned(),
        };

        match self.entries.entry(key) {
            Entry::Occupied(mut e) => {
                if self.is_fresh(e.get(), now) {
                    debug!(cache = %identity.name(), "Token cache hit");
                    return Ok(e.get().clone());
                }
                match issue_token(identity, user, credentials, now) {
                    Ok(token) => {
                        debug!(cache = %identity.name(), "Token cache refreshed");
                        e.insert(token.clone());
                        Ok(token)
                    }
                    Err(err) => {
                        e.remove();
                        Err(err)
                    }
                }
            }
            Entry::Vacant(e) => {
                let token = issue_token(identity, user, credentials, now)?;
                debug!(cache = %identity.name(), "Token cache populated");
                e.insert(token.clone());
                Ok(token)
            }
        }
    }

    /// Drop every token that is no longer fresh at `now`.
    pub fn purge_stale(&self, now: DateTime<Utc>) {
        self.entries.retain(|_, token| self.is_fresh(token, now));
    }

    /// Number of cached tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached token.
    pub fn clear(&self) {
        self.entries.clear();
    }

    fn is_fresh(&self, token: &AuthToken, now: DateTime<Utc>) -> bool {
        now >= token.issued_at() && now < token.issued_at() + self.refresh_after
    }
}
