//! Token generation errors.
//!
//! The three kinds are kept apart so a caller can tell "fix your configuration"
//! ([`TokenErrorKind::InvalidEndpoint`]) from "retry credentials"
//! ([`TokenErrorKind::CredentialResolution`]) from a broken signing invariant
//! ([`TokenErrorKind::Signing`]).

use ecauth_sigv4::{AuthError, CredentialError};

/// Errors raised while generating an authentication token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The endpoint hostname cannot be turned into a cache identity.
    #[error("invalid endpoint {hostname:?}: {reason}")]
    InvalidEndpoint {
        /// The hostname as supplied.
        hostname: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The credential source could not produce usable credentials.
    #[error("credential resolution failed: {0}")]
    CredentialResolution(#[from] CredentialError),

    /// The request could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// The kind of a [`TokenError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenErrorKind {
    /// See [`TokenError::InvalidEndpoint`].
    InvalidEndpoint,
    /// See [`TokenError::CredentialResolution`].
    CredentialResolution,
    /// See [`TokenError::Signing`].
    Signing,
}

impl TokenError {
    /// Create an [`TokenError::InvalidEndpoint`] error.
    #[must_use]
    pub fn invalid_endpoint(hostname: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            hostname: hostname.into(),
            reason: reason.into(),
        }
    }

    /// The kind of this error.
    #[must_use]
    pub fn kind(&self) -> TokenErrorKind {
        match self {
            Self::InvalidEndpoint { .. } => TokenErrorKind::InvalidEndpoint,
            Self::CredentialResolution(_) => TokenErrorKind::CredentialResolution,
            Self::Signing(_) => TokenErrorKind::Signing,
        }
    }

    /// Whether retrying later may succeed. Only credential resolution is transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == TokenErrorKind::CredentialResolution
    }
}

impl From<AuthError> for TokenError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(reason) => Self::Signing(reason),
            other => Self::Signing(other.to_string()),
        }
    }
}
