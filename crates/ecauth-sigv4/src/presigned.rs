//! Parsing and verification of SigV4 presigned queries.
//!
//! A presigned query carries its authentication in these parameters:
//!
//! - `X-Amz-Algorithm` - Must be `AWS4-HMAC-SHA256`
//! - `X-Amz-Credential` - `AKID/date/region/service/aws4_request`
//! - `X-Amz-Date` - ISO 8601 basic format timestamp (`YYYYMMDDTHHMMSSZ`)
//! - `X-Amz-Expires` - Validity duration in seconds
//! - `X-Amz-Security-Token` - Optional session token
//! - `X-Amz-SignedHeaders` - Semicolon-separated signed header names
//! - `X-Amz-Signature` - The hex-encoded signature
//!
//! Verification is only needed by holders of the secret key (tests, local tooling);
//! the cache server does its own.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::build_canonical_request;
use crate::error::AuthError;
use crate::sigv4::{
    ALGORITHM, AuthResult, MAX_EXPIRES_SECS, TIMESTAMP_FORMAT, X_AMZ_ALGORITHM, X_AMZ_CREDENTIAL, X_AMZ_DATE,
    X_AMZ_EXPIRES, X_AMZ_SECURITY_TOKEN, X_AMZ_SIGNATURE, X_AMZ_SIGNED_HEADERS,
    build_credential_scope, build_string_to_sign, compute_signature, derive_signing_key,
};

/// Parsed components from presigned query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPresignedParams {
    /// The signing algorithm (must be `AWS4-HMAC-SHA256`).
    pub algorithm: String,
    /// The access key ID.
    pub access_key_id: String,
    /// The date component of the credential scope (YYYYMMDD).
    pub date: String,
    /// The AWS region from the credential scope.
    pub region: String,
    /// The AWS service from the credential scope.
    pub service: String,
    /// The ISO 8601 basic format timestamp.
    pub timestamp: String,
    /// The validity duration in seconds.
    pub expires: u64,
    /// The session token, if the signer used temporary credentials.
    pub security_token: Option<String>,
    /// The list of signed header names.
    pub signed_headers: Vec<String>,
    /// The hex-encoded signature.
    pub signature: String,
}

/// A presigned request as received: method, host, path and raw encoded query.
#[derive(Debug, Clone, Copy)]
pub struct PresignedRequest<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// Value of the `host` header.
    pub host: &'a str,
    /// Request path.
    pub path: &'a str,
    /// Encoded query string, without the leading `?`.
    pub query: &'a str,
}

/// Parse presigned query parameters into their components.
///
/// # Errors
///
/// Returns [`AuthError::MissingQueryParam`] if any required parameter is absent,
/// [`AuthError::UnsupportedAlgorithm`] if the algorithm is not `AWS4-HMAC-SHA256`,
/// [`AuthError::InvalidCredential`] if the credential format is invalid or its date is
/// not the date of `X-Amz-Date`, or [`AuthError::InvalidExpiry`] if `X-Amz-Expires` is
/// outside `1..=604800`.
pub fn parse_presigned_params(query: &str) -> Result<ParsedPresignedParams, AuthError> {
    let params: HashMap<String, String> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            Some((key.to_owned(), url_decode(value)))
        })
        .collect();

    let algorithm = get_required_param(&params, X_AMZ_ALGORITHM)?;
    if algorithm != ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(algorithm));
    }

    let credential = get_required_param(&params, X_AMZ_CREDENTIAL)?;
    let timestamp = get_required_param(&params, X_AMZ_DATE)?;
    let expires_str = get_required_param(&params, X_AMZ_EXPIRES)?;
    let signed_headers_str = get_required_param(&params, X_AMZ_SIGNED_HEADERS)?;
    let signature = get_required_param(&params, X_AMZ_SIGNATURE)?;

    // AKID/date/region/service/aws4_request
    let cred_parts: Vec<&str> = credential.splitn(5, '/').collect();
    if cred_parts.len() != 5 || cred_parts[4] != "aws4_request" {
        return Err(AuthError::InvalidCredential);
    }
    if timestamp.get(..8) != Some(cred_parts[1]) {
        debug!(date = %cred_parts[1], timestamp = %timestamp, "Credential scope date mismatch");
        return Err(AuthError::InvalidCredential);
    }

    let expires: u64 = expires_str
        .parse()
        .map_err(|_| AuthError::MissingQueryParam("X-Amz-Expires (invalid integer)".to_owned()))?;
    if expires == 0 || expires > MAX_EXPIRES_SECS {
        return Err(AuthError::InvalidExpiry(expires));
    }

    let signed_headers: Vec<String> = signed_headers_str
        .split(';')
        .map(ToOwned::to_owned)
        .collect();

    Ok(ParsedPresignedParams {
        algorithm,
        access_key_id: cred_parts[0].to_owned(),
        date: cred_parts[1].to_owned(),
        region: cred_parts[2].to_owned(),
        service: cred_parts[3].to_owned(),
        timestamp,
        expires,
        security_token: params.get(X_AMZ_SECURITY_TOKEN).cloned(),
        signed_headers,
        signature,
    })
}

/// Verify a presigned query against `secret_key` at time `now`.
///
/// This function:
/// 1. Parses the presigned query parameters
/// 2. Checks the validity window against `now`
/// 3. Reconstructs the canonical request (excluding `X-Amz-Signature` from the query)
/// 4. Computes the expected signature
/// 5. Compares signatures using constant-time comparison
///
/// Only `host` may be signed, since the request carries no other headers.
///
/// # Errors
///
/// Returns an [`AuthError`] if:
/// - Required query parameters are missing or malformed
/// - `now` is outside the validity window
/// - A header other than `host` is signed
/// - The signature does not match
pub fn verify_presigned_query(
    request: &PresignedRequest<'_>,
    secret_key: &str,
    payload_hash: &str,
    now: DateTime<Utc>,
) -> Result<AuthResult, AuthError> {
    let parsed = parse_presigned_params(request.query)?;

    debug!(
        date = %parsed.date,
        region = %parsed.region,
        service = %parsed.service,
        expires = parsed.expires,
        "Verifying presigned query"
    );

    let expires_at = check_expiration(&parsed.timestamp, parsed.expires, now)?;

    if let Some(name) = parsed.signed_headers.iter().find(|name| *name != "host") {
        return Err(AuthError::MissingHeader(name.clone()));
    }

    let canonical_query = query_without_signature(request.query);
    let canonical_request = build_canonical_request(
        request.method,
        request.path,
        &canonical_query,
        &[("host", request.host)],
        &["host"],
        payload_hash,
    );
    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));

    let credential_scope = build_credential_scope(&parsed.date, &parsed.region, &parsed.service);
    let string_to_sign =
        build_string_to_sign(&parsed.timestamp, &credential_scope, &canonical_hash);

    let signing_key =
        derive_signing_key(secret_key, &parsed.date, &parsed.region, &parsed.service);
    let expected_signature = compute_signature(&signing_key, &string_to_sign);

    if parsed
        .signature
        .as_bytes()
        .ct_eq(expected_signature.as_bytes())
        .into()
    {
        debug!(region = %parsed.region, "Presigned query verification succeeded");
        Ok(AuthResult {
            access_key_id: parsed.access_key_id,
            region: parsed.region,
            service: parsed.service,
            signed_headers: parsed.signed_headers,
            expires_at,
        })
    } else {
        debug!("Presigned query signature mismatch");
        Err(AuthError::SignatureDoesNotMatch)
    }
}

/// Drop `X-Amz-Signature` from an encoded query, keeping the rest untouched.
fn query_without_signature(query: &str) -> String {
    let prefix = format!("{X_AMZ_SIGNATURE}=");
    query
        .split('&')
        .filter(|param| !param.starts_with(&prefix))
        .collect::<Vec<_>>()
        .join("&")
}

/// Check `now` against the validity window and return its end.
fn check_expiration(
    timestamp: &str,
    expires: u64,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, AuthError> {
    let request_time = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .map_err(|_| AuthError::MissingQueryParam("X-Amz-Date (invalid format)".to_owned()))?
        .and_utc();

    let expiry_time = i64::try_from(expires)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|lifetime| request_time.checked_add_signed(lifetime))
        .ok_or(AuthError::InvalidExpiry(expires))?;

    if now < request_time {
        return Err(AuthError::RequestNotYetValid);
    }
    if now > expiry_time {
        return Err(AuthError::RequestExpired);
    }

    Ok(expiry_time)
}

/// Perform basic percent-decoding of a URL-encoded string.
fn url_decode(input: &str) -> String {
    percent_encoding::percent_decode_str(input)
        .decode_utf8_lossy()
        .into_owned()
}

/// Extract a required query parameter, returning an error if missing.
fn get_required_param(params: &HashMap<String, String>, name: &str) -> Result<String, AuthError> {
    params
        .get(name)
        .cloned()
        .ok_or_else(|| AuthError::MissingQueryParam(name.to_owned()))
}
