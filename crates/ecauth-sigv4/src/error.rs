//! Error types for SigV4 signing and presigned-query verification.

/// Errors raised while signing a request or verifying a presigned query.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request could not be signed (empty credentials, empty scope, bad expiry).
    #[error("signing failed: {0}")]
    Signing(String),

    /// The signing algorithm is not supported (only AWS4-HMAC-SHA256 is supported).
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A header named in `X-Amz-SignedHeaders` is not available to the verifier.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// The `X-Amz-Credential` value does not match `AKID/date/region/service/aws4_request`.
    #[error("Invalid credential format")]
    InvalidCredential,

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// The current time is past `X-Amz-Date` + `X-Amz-Expires`.
    #[error("Request has expired")]
    RequestExpired,

    /// The current time is before `X-Amz-Date`.
    #[error("Request is not yet valid")]
    RequestNotYetValid,

    /// `X-Amz-Expires` is zero or longer than the seven-day SigV4 limit.
    #[error("X-Amz-Expires of {0}s is outside 1..=604800")]
    InvalidExpiry(u64),

    /// A required presigned query parameter is missing or malformed.
    #[error("Missing required query parameter: {0}")]
    MissingQueryParam(String),

    /// A token does not have the `<resource-name>/?<query>` shape.
    #[error("Malformed token: {0}")]
    MalformedToken(String),
}

/// Failure of a [`CredentialSource`](crate::credentials::CredentialSource).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The source has no credentials to offer (e.g. variables unset).
    #[error("credentials not found: {0}")]
    NotFound(String),

    /// The source failed while producing credentials.
    #[error("credential provider error: {0}")]
    Provider(String),
}
