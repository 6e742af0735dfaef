//! Concurrent token generation.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use ecauth_sigv4::{CredentialError, Credentials};
    use ecauth_token::{ClientAuthConfig, IamAuthConfig, verify_token};

    use crate::{SECRET_KEY, SERVERLESS_ENDPOINT, config_for, credentials, signing_time};

    #[test]
    fn test_should_generate_tokens_from_many_threads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let source = move || -> Result<Credentials, CredentialError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(credentials())
        };
        let auth = Arc::new(
            IamAuthConfig::from_config(&config_for(SERVERLESS_ENDPOINT), Arc::new(source))
                .unwrap()
                .with_clock(signing_time),
        );

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let auth = Arc::clone(&auth);
                thread::spawn(move || auth.password().unwrap())
            })
            .collect();
        let passwords: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 16);
        for password in &passwords {
            assert!(verify_token(password, SECRET_KEY, signing_time()).is_ok());
        }
    }

    #[test]
    fn test_should_share_cached_token_across_threads() {
        let mut config = config_for(SERVERLESS_ENDPOINT);
        config.token_cache = true;
        let auth = Arc::new(
            IamAuthConfig::from_config(&config, crate::credential_source())
                .unwrap()
                .with_clock(signing_time),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let auth = Arc::clone(&auth);
                thread::spawn(move || auth.token().unwrap())
            })
            .collect();
        let tokens: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(tokens.windows(2).all(|w| w[0] == w[1]));
    }
}
