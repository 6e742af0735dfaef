//! Token assembly, generation and inspection.
//!
//! A token is the signed connect request with its placeholder scheme removed:
//!
//! ```text
//! <resource-name>/?Action=connect&User=<user>&X-Amz-Algorithm=...&X-Amz-Signature=<hex>
//! ```
//!
//! Parameters appear in the order they were canonicalized for signing, with the
//! signature last.

use std::fmt;

use chrono::{DateTime, Utc};
use ecauth_sigv4::presigned::ParsedPresignedParams;
use ecauth_sigv4::sigv4::EMPTY_PAYLOAD_SHA256;
use ecauth_sigv4::{
    AuthError, AuthResult, CredentialSource, Credentials, PresignedRequest, canonical,
    parse_presigned_params, verify_presigned_query,
};
use tracing::debug;

use crate::error::TokenError;
use crate::identity::CacheIdentity;
use crate::request::{PLACEHOLDER_SCHEME, SigningRequest};
use crate::signer::{SignedRequest, resolve_credentials, sign_request};

/// A signed, serialized connect request used as a password.
///
/// `Display` prints the token value; `Debug` only its length.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl AuthToken {
    /// The token string.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Consume the token, returning its string.
    #[must_use]
    pub fn into_value(self) -> String {
        self.value
    }

    /// Signing time.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// End of the validity window, `issued_at` + 900 s.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token is no longer valid at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Validity left at `now`, zero once expired.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        (self.expires_at - now).max(chrono::Duration::zero())
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("len", &self.value.len())
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Flatten a signed request into a token.
#[must_use]
pub fn assemble_token(signed: &SignedRequest) -> AuthToken {
    let url = format!(
        "{}?{}",
        signed.virtual_endpoint(),
        canonical::join_query_pairs(signed.query_params())
    );
    let value = url
        .strip_prefix(PLACEHOLDER_SCHEME)
        .map_or_else(|| url.clone(), ToOwned::to_owned);

    AuthToken {
        value,
        issued_at: signed.issued_at(),
        expires_at: signed.expires_at(),
    }
}

/// Generate a token for `user` against `identity` with the given credentials.
///
/// # Errors
///
/// Returns [`TokenError::Signing`] if the credentials are empty or the identity's
/// region is empty.
pub fn issue_token(
    identity: &CacheIdentity,
    user: &str,
    credentials: &Credentials,
    now: DateTime<Utc>,
) -> Result<AuthToken, TokenError> {
    let request = SigningRequest::connect(identity, user);
    let signed = sign_request(&request, credentials, now)?;
    let token = assemble_token(&signed);

    debug!(
        cache = %identity.name(),
        len = token.value.len(),
        expires_at = %token.expires_at,
        "Issued auth token"
    );

    Ok(token)
}

/// Resolve credentials from `source` and generate a token.
///
/// # Errors
///
/// Returns [`TokenError::CredentialResolution`] if `source` fails, or
/// [`TokenError::Signing`] as for [`issue_token`].
pub fn generate_token(
    identity: &CacheIdentity,
    user: &str,
    source: &dyn CredentialSource,
    now: DateTime<Utc>,
) -> Result<AuthToken, TokenError> {
    let credentials = resolve_credentials(source)?;
    issue_token(identity, user, &credentials, now)
}

/// The parts of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectedToken {
    /// Resource name before `/?`.
    pub resource_name: String,
    /// The encoded query after `/?`.
    pub query: String,
    /// `Action` parameter.
    pub action: Option<String>,
    /// `User` parameter.
    pub user: Option<String>,
    /// `ResourceType` parameter.
    pub resource_type: Option<String>,
    /// Signature parameters.
    pub presigned: ParsedPresignedParams,
}

/// Split a token into its resource name and parameters, accepting any parameter order.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if the token carries a scheme or lacks the
/// `/?` separator, and the errors of [`parse_presigned_params`] otherwise.
pub fn inspect_token(token: &str) -> Result<InspectedToken, AuthError> {
    if token.contains("://") {
        return Err(AuthError::MalformedToken("token carries a URL scheme".to_owned()));
    }
    let (resource_name, query) = token
        .split_once("/?")
        .ok_or_else(|| AuthError::MalformedToken("missing '/?' separator".to_owned()))?;
    if resource_name.is_empty() {
        return Err(AuthError::MalformedToken("empty resource name".to_owned()));
    }

    let presigned = parse_presigned_params(query)?;
    let find = |name: &str| {
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    Ok(InspectedToken {
        resource_name: resource_name.to_owned(),
        query: query.to_owned(),
        action: find("Action"),
        user: find("User"),
        resource_type: find("ResourceType"),
        presigned,
    })
}

/// Verify a token against `secret_key` at `now`.
///
/// # Errors
///
/// Returns the errors of [`inspect_token`] and [`verify_presigned_query`].
pub fn verify_token(
    token: &str,
    secret_key: &str,
    now: DateTime<Utc>,
) -> Result<AuthResult, AuthError> {
    let inspected = inspect_token(token)?;
    let request = PresignedRequest {
        method: "GET",
        host: &inspected.resource_name,
        path: "/",
        query: &inspected.query,
    };
    verify_presigned_query(&request, secret_key, EMPTY_PAYLOAD_SHA256, now)
}
