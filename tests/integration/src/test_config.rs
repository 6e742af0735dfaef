//! Environment-driven configuration feeding the auth adapter.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use ecauth_core::{CacheVariant, EcAuthConfig};
    use ecauth_token::{ClientAuthConfig, IamAuthConfig, verify_token};

    use crate::{SECRET_KEY, credential_source, init_tracing, signing_time};

    fn config_from(vars: &[(&str, &str)]) -> EcAuthConfig {
        init_tracing();
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        EcAuthConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_should_build_adapter_from_environment() {
        let config = config_from(&[
            ("ELASTICACHE_ENDPOINT", "my-cluster-0001-002.abc123.0001.euw1.cache.amazonaws.com"),
            ("ELASTICACHE_USER", "reporting"),
            ("AWS_REGION", "eu-west-1"),
            ("ELASTICACHE_TLS", "false"),
            ("ELASTICACHE_CONNECT_TIMEOUT_MS", "2500"),
        ]);
        config.validate().unwrap();

        let auth = IamAuthConfig::from_config(&config, credential_source()).unwrap();
        assert_eq!(auth.user(), "reporting");
        assert_eq!(auth.identity().name(), "my-cluster");
        assert_eq!(auth.identity().region().as_str(), "eu-west-1");
        assert_eq!(auth.connect_timeout(), Duration::from_millis(2500));
        assert_eq!(auth.read_timeout(), Duration::from_secs(10));
        assert!(!auth.tls().enabled);
    }

    #[test]
    fn test_should_use_explicit_cache_name_and_variant() {
        let config = config_from(&[
            ("ELASTICACHE_ENDPOINT", "redis.internal.example.com"),
            ("ELASTICACHE_CACHE_NAME", "orders-cache"),
            ("ELASTICACHE_SERVERLESS", "true"),
            ("AWS_REGION", "us-west-2"),
        ]);

        let auth = IamAuthConfig::from_config(&config, credential_source())
            .unwrap()
            .with_clock(signing_time);
        assert_eq!(auth.identity().name(), "orders-cache");
        assert_eq!(auth.identity().variant(), CacheVariant::ServerlessCache);

        let password = auth.password().unwrap();
        assert!(password.starts_with("orders-cache/?Action=connect&ResourceType=ServerlessCache&"));
        let result = verify_token(&password, SECRET_KEY, signing_time()).unwrap();
        assert_eq!(result.region, "us-west-2");
    }

    #[test]
    fn test_should_reject_missing_endpoint() {
        let config = config_from(&[("AWS_REGION", "eu-west-1")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_should_enable_token_cache_from_environment() {
        let config = config_from(&[
            ("ELASTICACHE_ENDPOINT", "cache-01-vk-yiy6se.serverless.euw1.cache.amazonaws.com"),
            ("ELASTICACHE_TOKEN_CACHE", "1"),
        ]);
        assert!(config.token_cache);

        let auth = IamAuthConfig::from_config(&config, credential_source()).unwrap();
        assert_eq!(auth.token().unwrap(), auth.token().unwrap());
    }
}
