//! IAM authentication tokens for ElastiCache.
//!
//! A token is a SigV4-presigned `GET http://<cache>/?Action=connect&User=<user>`
//! request, minus its scheme, valid for 900 seconds. It is sent as the AUTH password
//! with the user id sent separately.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ecauth_core::EcAuthConfig;
//! use ecauth_sigv4::{Credentials, StaticCredentialSource};
//! use ecauth_token::{ClientAuthConfig, IamAuthConfig};
//!
//! let config = EcAuthConfig::builder()
//!     .endpoint("my-cache.serverless.euw1.cache.amazonaws.com".to_owned())
//!     .build();
//! let source = StaticCredentialSource::new(Credentials::new("AKIDEXAMPLE", "secret"));
//! let auth = IamAuthConfig::from_config(&config, Arc::new(source)).unwrap();
//!
//! let password = auth.password().unwrap();
//! assert!(password.starts_with("my-cache/?Action=connect&ResourceType=ServerlessCache&"));
//! ```

mod adapter;
mod cache;
mod error;
mod identity;
mod request;
mod signer;
mod token;

pub use adapter::{ClientAuthConfig, IamAuthConfig, TlsOptions};
pub use cache::{DEFAULT_REFRESH_AFTER, TokenCache};
pub use error::{TokenError, TokenErrorKind};
pub use identity::{CacheIdentity, SERVICE_NAME, resolve_identity};
pub use request::{CONNECT_ACTION, SigningRequest};
pub use signer::{SignedRequest, TOKEN_EXPIRY_SECS, sign_request};
pub use token::{
    AuthToken, InspectedToken, assemble_token, generate_token, inspect_token, issue_token,
    verify_token,
};
