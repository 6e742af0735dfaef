//! AWS Signature Version 4 query presigning.
//!
//! [`presign_query`] runs the four SigV4 steps for a request whose signature travels in
//! the query string:
//!
//! 1. Build the canonical request from method, path, the encoded and sorted query
//!    (including the `X-Amz-*` presign parameters) and the `host` header.
//! 2. Build the string to sign from the timestamp, the credential scope
//!    (`date/region/service/aws4_request`) and the canonical request hash.
//! 3. Derive the signing key by HMAC-chaining the secret key through date, region,
//!    service and `aws4_request`.
//! 4. HMAC the string to sign with that key and hex-encode the result.
//!
//! The output is deterministic for fixed inputs: the timestamp is a parameter, never
//! read from the clock here.

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::{build_canonical_request, encode_query_pairs, join_query_pairs};
use crate::credentials::Credentials;
use crate::error::AuthError;

/// The only algorithm supported by this implementation.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// SHA-256 of the empty payload.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Payload hash placeholder used by S3-style presigned URLs.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Longest validity window SigV4 allows for a presigned request (seven days).
pub const MAX_EXPIRES_SECS: u64 = 604_800;

/// `X-Amz-Date` format (ISO 8601 basic).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Credential scope date format.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Terminator of the credential scope and of the signing-key chain.
const SCOPE_TERMINATOR: &str = "aws4_request";

/// `X-Amz-Algorithm` query parameter.
pub const X_AMZ_ALGORITHM: &str = "X-Amz-Algorithm";
/// `X-Amz-Credential` query parameter.
pub const X_AMZ_CREDENTIAL: &str = "X-Amz-Credential";
/// `X-Amz-Date` query parameter.
pub const X_AMZ_DATE: &str = "X-Amz-Date";
/// `X-Amz-Expires` query parameter.
pub const X_AMZ_EXPIRES: &str = "X-Amz-Expires";
/// `X-Amz-Security-Token` query parameter.
pub const X_AMZ_SECURITY_TOKEN: &str = "X-Amz-Security-Token";
/// `X-Amz-SignedHeaders` query parameter.
pub const X_AMZ_SIGNED_HEADERS: &str = "X-Amz-SignedHeaders";
/// `X-Amz-Signature` query parameter.
pub const X_AMZ_SIGNATURE: &str = "X-Amz-Signature";

type HmacSha256 = Hmac<Sha256>;

/// The request to presign. Only the `host` header is signed.
#[derive(Debug, Clone, Copy)]
pub struct PresignRequest<'a> {
    /// HTTP method, e.g. `GET`.
    pub method: &'a str,
    /// Value of the signed `host` header.
    pub host: &'a str,
    /// Request path, e.g. `/`.
    pub path: &'a str,
    /// Application query parameters, unencoded. Must not use the `X-Amz-` prefix.
    pub params: &'a [(String, String)],
}

/// Scope, time and expiry of a presigned request.
#[derive(Debug, Clone, Copy)]
pub struct PresignSettings<'a> {
    /// Signing region.
    pub region: &'a str,
    /// Signing service name.
    pub service: &'a str,
    /// Signing time; becomes `X-Amz-Date`.
    pub timestamp: DateTime<Utc>,
    /// Validity window in seconds; becomes `X-Amz-Expires`.
    pub expires_in: u64,
    /// Hashed payload line of the canonical request.
    pub payload_hash: &'a str,
}

/// The signed query parameters of a presigned request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedQuery {
    /// Encoded parameters in canonical order, with `X-Amz-Signature` appended last.
    pub params: Vec<(String, String)>,
    /// Hex-encoded signature.
    pub signature: String,
    /// Signing time.
    pub timestamp: DateTime<Utc>,
    /// Validity window in seconds.
    pub expires_in: u64,
}

impl PresignedQuery {
    /// Serialize the parameters as a query string, in signing order.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        join_query_pairs(&self.params)
    }

    /// End of the validity window.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        let secs = i64::try_from(self.expires_in.min(MAX_EXPIRES_SECS)).unwrap_or_default();
        self.timestamp + chrono::Duration::seconds(secs)
    }
}

/// Outcome of a successful presigned-query verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    /// The access key id that signed the query.
    pub access_key_id: String,
    /// The region from the credential scope.
    pub region: String,
    /// The service from the credential scope.
    pub service: String,
    /// The signed header names.
    pub signed_headers: Vec<String>,
    /// End of the validity window.
    pub expires_at: DateTime<Utc>,
}

/// Presign `request` with `credentials`, returning the signed query parameters.
///
/// The session token, when present, is added as `X-Amz-Security-Token` before signing
/// and is therefore covered by the signature.
///
/// # Errors
///
/// Returns [`AuthError::Signing`] if the access key id, secret key, host, region or
/// service is empty, if `expires_in` is outside `1..=604800`, or if an application
/// parameter uses the reserved `X-Amz-` prefix.
pub fn presign_query(
    request: &PresignRequest<'_>,
    credentials: &Credentials,
    settings: &PresignSettings<'_>,
) -> Result<PresignedQuery, AuthError> {
    validate_inputs(request, credentials, settings)?;

    let timestamp = settings.timestamp.format(TIMESTAMP_FORMAT).to_string();
    let date = settings.timestamp.format(DATE_FORMAT).to_string();
    let credential_scope = build_credential_scope(&date, settings.region, settings.service);

    let mut raw_params: Vec<(&str, String)> = request
        .params
        .iter()
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect();
    raw_params.push((X_AMZ_ALGORITHM, ALGORITHM.to_owned()));
    raw_params.push((
        X_AMZ_CREDENTIAL,
        format!("{}/{credential_scope}", credentials.access_key_id()),
    ));
    raw_params.push((X_AMZ_DATE, timestamp.clone()));
    raw_params.push((X_AMZ_EXPIRES, settings.expires_in.to_string()));
    if let Some(token) = credentials.session_token() {
        raw_params.push((X_AMZ_SECURITY_TOKEN, token.to_owned()));
    }
    raw_params.push((X_AMZ_SIGNED_HEADERS, "host".to_owned()));

    let mut params = encode_query_pairs(&raw_params);
    let canonical_query = join_query_pairs(&params);

    let canonical_request = build_canonical_request(
        request.method,
        request.path,
        &canonical_query,
        &[("host", request.host)],
        &["host"],
        settings.payload_hash,
    );
    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let string_to_sign = build_string_to_sign(&timestamp, &credential_scope, &canonical_hash);

    let signing_key = derive_signing_key(
        credentials.secret_access_key(),
        &date,
        settings.region,
        settings.service,
    );
    let signature = compute_signature(&signing_key, &string_to_sign);

    debug!(
        access_key_id = %credentials.masked_access_key_id(),
        scope = %credential_scope,
        expires_in = settings.expires_in,
        session_token = credentials.session_token().is_some(),
        "Presigned request"
    );

    params.push((X_AMZ_SIGNATURE.to_owned(), signature.clone()));

    Ok(PresignedQuery {
        params,
        signature,
        timestamp: settings.timestamp,
        expires_in: settings.expires_in,
    })
}

fn validate_inputs(
    request: &PresignRequest<'_>,
    credentials: &Credentials,
    settings: &PresignSettings<'_>,
) -> Result<(), AuthError> {
    if credentials.access_key_id().trim().is_empty() {
        return Err(AuthError::Signing("access key id is empty".to_owned()));
    }
    if credentials.secret_access_key().is_empty() {
        return Err(AuthError::Signing("secret access key is empty".to_owned()));
    }
    if request.host.is_empty() {
        return Err(AuthError::Signing("host is empty".to_owned()));
    }
    if settings.region.is_empty() {
        return Err(AuthError::Signing("region is empty".to_owned()));
    }
    if settings.service.is_empty() {
        return Err(AuthError::Signing("service is empty".to_owned()));
    }
    if settings.expires_in == 0 || settings.expires_in > MAX_EXPIRES_SECS {
        return Err(AuthError::Signing(format!(
            "expiry of {}s is outside 1..={MAX_EXPIRES_SECS}",
            settings.expires_in
        )));
    }
    if let Some((key, _)) = request.params.iter().find(|(k, _)| k.starts_with("X-Amz-")) {
        return Err(AuthError::Signing(format!("reserved query parameter: {key}")));
    }
    Ok(())
}

/// Build the credential scope `date/region/service/aws4_request`.
#[must_use]
pub fn build_credential_scope(date: &str, region: &str, service: &str) -> String {
    format!("{date}/{region}/{service}/{SCOPE_TERMINATOR}")
}

/// Build the SigV4 string to sign.
///
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use ecauth_sigv4::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using the HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the hex-encoded HMAC-SHA256 signature of `data` under `signing_key`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Compute the SHA-256 hash of a payload as a hex string.
///
/// # Examples
///
/// ```
/// use ecauth_sigv4::sigv4::{EMPTY_PAYLOAD_SHA256, hash_payload};
///
/// assert_eq!(hash_payload(b""), EMPTY_PAYLOAD_SHA256);
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
