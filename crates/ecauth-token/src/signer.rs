//! Signing of connect requests.

use chrono::{DateTime, Utc};
use ecauth_sigv4::sigv4::{EMPTY_PAYLOAD_SHA256, PresignRequest, PresignSettings, presign_query};
use ecauth_sigv4::{CredentialSource, Credentials};
use tracing::debug;

use crate::error::TokenError;
use crate::request::SigningRequest;

/// Validity window of every token, in seconds.
pub const TOKEN_EXPIRY_SECS: u64 = 900;

/// A signed connect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    virtual_endpoint: String,
    query_params: Vec<(String, String)>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SignedRequest {
    /// The virtual endpoint the request was signed for.
    #[must_use]
    pub fn virtual_endpoint(&self) -> &str {
        &self.virtual_endpoint
    }

    /// Encoded query parameters in signing order, `X-Amz-Signature` last.
    #[must_use]
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    /// Signing time.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// End of the validity window.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Sign `request` with `credentials` at `now`, valid for [`TOKEN_EXPIRY_SECS`].
///
/// # Errors
///
/// Returns [`TokenError::Signing`] if the credentials are empty or the request scope
/// is incomplete (empty region).
pub fn sign_request(
    request: &SigningRequest,
    credentials: &Credentials,
    now: DateTime<Utc>,
) -> Result<SignedRequest, TokenError> {
    let presign_request = PresignRequest {
        method: request.method().as_str(),
        host: request.host(),
        path: request.path(),
        params: request.query_params(),
    };
    let settings = PresignSettings {
        region: request.region(),
        service: request.service(),
        timestamp: now,
        expires_in: TOKEN_EXPIRY_SECS,
        payload_hash: EMPTY_PAYLOAD_SHA256,
    };

    let presigned = presign_query(&presign_request, credentials, &settings)?;
    let expires_at = presigned.expires_at();

    debug!(
        cache = %request.host(),
        access_key_id = %credentials.masked_access_key_id(),
        %expires_at,
        "Signed connect request"
    );

    Ok(SignedRequest {
        virtual_endpoint: request.virtual_endpoint(),
        query_params: presigned.params,
        issued_at: now,
        expires_at,
    })
}

/// Resolve credentials from `source`, mapping failures to
/// [`TokenError::CredentialResolution`].
pub fn resolve_credentials(source: &dyn CredentialSource) -> Result<Credentials, TokenError> {
    source.credentials().map_err(TokenError::CredentialResolution)
}
