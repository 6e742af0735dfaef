//! End-to-end token generation and verification.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ecauth_core::CacheVariant;
    use ecauth_sigv4::AuthError;
    use ecauth_token::{ClientAuthConfig, IamAuthConfig, TokenErrorKind, inspect_token, verify_token};

    use crate::{
        ACCESS_KEY, CLUSTER_ENDPOINT, SECRET_KEY, SERVERLESS_ENDPOINT, config_for,
        credential_source, signing_time,
    };

    fn auth_for(endpoint: &str) -> IamAuthConfig {
        IamAuthConfig::from_config(&config_for(endpoint), credential_source())
            .unwrap()
            .with_clock(signing_time)
    }

    fn query_params(token: &str) -> HashMap<String, String> {
        let (_, query) = token.split_once("/?").unwrap();
        form_urlencoded::parse(query.as_bytes()).into_owned().collect()
    }

    #[test]
    fn test_should_issue_verifiable_serverless_token() {
        let auth = auth_for(SERVERLESS_ENDPOINT);
        let password = auth.password().unwrap();

        assert!(password.starts_with("cache-01-vk-yiy6se/?"));
        assert!(!password.contains("://"));

        let result = verify_token(&password, SECRET_KEY, signing_time()).unwrap();
        assert_eq!(result.access_key_id, ACCESS_KEY);
        assert_eq!(result.region, "eu-west-1");
        assert_eq!(result.service, "elasticache");
        assert_eq!(result.signed_headers, vec!["host"]);
    }

    #[test]
    fn test_should_issue_verifiable_cluster_token() {
        let auth = auth_for(CLUSTER_ENDPOINT);
        assert_eq!(auth.identity().name(), "orders");
        assert_eq!(auth.identity().variant(), CacheVariant::Cluster);

        let password = auth.password().unwrap();
        let params = query_params(&password);
        assert_eq!(params.get("Action").map(String::as_str), Some("connect"));
        assert_eq!(params.get("User").map(String::as_str), Some("app-user"));
        assert!(!params.contains_key("ResourceType"));
        assert!(verify_token(&password, SECRET_KEY, signing_time()).is_ok());
    }

    #[test]
    fn test_should_match_resource_type_to_variant() {
        let serverless = auth_for(SERVERLESS_ENDPOINT).password().unwrap();
        let cluster = auth_for(CLUSTER_ENDPOINT).password().unwrap();
        assert_eq!(
            query_params(&serverless).get("ResourceType").map(String::as_str),
            Some("ServerlessCache")
        );
        assert!(!query_params(&cluster).contains_key("ResourceType"));
    }

    #[test]
    fn test_should_be_deterministic_for_fixed_clock() {
        let auth = auth_for(SERVERLESS_ENDPOINT);
        assert_eq!(auth.password().unwrap(), auth.password().unwrap());
    }

    #[test]
    fn test_should_encode_expiry_window() {
        let token = auth_for(SERVERLESS_ENDPOINT).token().unwrap();
        let inspected = inspect_token(token.value()).unwrap();
        assert_eq!(inspected.presigned.expires, 900);
        assert_eq!(inspected.presigned.timestamp, "20240301T120000Z");
        assert_eq!(
            token.expires_at(),
            signing_time() + chrono::Duration::seconds(900)
        );
    }

    #[test]
    fn test_should_reject_token_outside_window() {
        let password = auth_for(SERVERLESS_ENDPOINT).password().unwrap();
        assert!(matches!(
            verify_token(
                &password,
                SECRET_KEY,
                signing_time() + chrono::Duration::seconds(901)
            ),
            Err(AuthError::RequestExpired)
        ));
        assert!(matches!(
            verify_token(
                &password,
                SECRET_KEY,
                signing_time() - chrono::Duration::seconds(1)
            ),
            Err(AuthError::RequestNotYetValid)
        ));
    }

    #[test]
    fn test_should_reject_token_for_other_cache() {
        let password = auth_for(SERVERLESS_ENDPOINT).password().unwrap();
        let forged = password.replacen("cache-01-vk-yiy6se", "cache-02", 1);
        assert!(matches!(
            verify_token(&forged, SECRET_KEY, signing_time()),
            Err(AuthError::SignatureDoesNotMatch)
        ));
    }

    #[test]
    fn test_should_carry_session_token_from_temporary_credentials() {
        let source = || -> Result<ecauth_sigv4::Credentials, ecauth_sigv4::CredentialError> {
            Ok(crate::credentials().with_session_token("FwoGZXIvYXdzEXAMPLE//+token=="))
        };
        let auth = IamAuthConfig::from_config(&config_for(SERVERLESS_ENDPOINT), std::sync::Arc::new(source))
            .unwrap()
            .with_clock(signing_time);
        let password = auth.password().unwrap();

        assert_eq!(
            query_params(&password)
                .get("X-Amz-Security-Token")
                .map(String::as_str),
            Some("FwoGZXIvYXdzEXAMPLE//+token==")
        );
        assert!(verify_token(&password, SECRET_KEY, signing_time()).is_ok());
    }

    #[test]
    fn test_should_fail_with_invalid_endpoint_before_signing() {
        let err = IamAuthConfig::from_config(&config_for("localhost"), credential_source())
            .unwrap_err();
        assert_eq!(err.kind(), TokenErrorKind::InvalidEndpoint);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_should_fail_with_signing_error_for_empty_access_key() {
        let source = || -> Result<ecauth_sigv4::Credentials, ecauth_sigv4::CredentialError> {
            Ok(ecauth_sigv4::Credentials::new("", SECRET_KEY))
        };
        let auth = IamAuthConfig::from_config(&config_for(SERVERLESS_ENDPOINT), std::sync::Arc::new(source))
            .unwrap();
        assert_eq!(auth.password().unwrap_err().kind(), TokenErrorKind::Signing);
    }

    #[test]
    fn test_should_convert_sdk_credentials() {
        let sdk = aws_credential_types::Credentials::new(
            ACCESS_KEY,
            SECRET_KEY,
            Some("session".to_owned()),
            None,
            "integration-test",
        );
        let credentials = ecauth_sigv4::Credentials::from(sdk);
        assert_eq!(credentials.access_key_id(), ACCESS_KEY);
        assert_eq!(credentials.secret_access_key(), SECRET_KEY);
        assert_eq!(credentials.session_token(), Some("session"));
    }
}
