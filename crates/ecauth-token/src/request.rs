//! The signable "connect" request.

use http::Method;
use tracing::debug;

use crate::identity::CacheIdentity;

/// Scheme of the virtual endpoint. Signing needs a URL; the token drops the scheme.
pub const PLACEHOLDER_SCHEME: &str = "http://";

/// The only action a token grants.
pub const CONNECT_ACTION: &str = "connect";

/// `ResourceType` value sent for serverless caches.
pub const SERVERLESS_RESOURCE_TYPE: &str = "ServerlessCache";

/// A fixed-shape `GET http://<resource-name>/?Action=connect&User=<user>` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    method: Method,
    host: String,
    path: &'static str,
    region: String,
    service: String,
    query_params: Vec<(String, String)>,
}

impl SigningRequest {
    /// Build the connect request for `user` against `identity`.
    ///
    /// Carries `Action=connect`, `User=<user>`, and `ResourceType=ServerlessCache` for
    /// serverless caches only.
    #[must_use]
    pub fn connect(identity: &CacheIdentity, user: &str) -> Self {
        let mut query_params = vec![
            ("Action".to_owned(), CONNECT_ACTION.to_owned()),
            ("User".to_owned(), user.to_owned()),
        ];
        if identity.variant().is_serverless() {
            query_params.push((
                "ResourceType".to_owned(),
                SERVERLESS_RESOURCE_TYPE.to_owned(),
            ));
        }

        debug!(
            cache = %identity.name(),
            variant = %identity.variant(),
            params = query_params.len(),
            "Built connect request"
        );

        Self {
            method: Method::GET,
            host: identity.name().to_owned(),
            path: "/",
            region: identity.region().as_str().to_owned(),
            service: identity.service_name().to_owned(),
            query_params,
        }
    }

    /// HTTP method, always `GET`.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Virtual host, the cache resource name. Signed as the `host` header.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// The virtual endpoint `http://<resource-name>/`.
    #[must_use]
    pub fn virtual_endpoint(&self) -> String {
        format!("{PLACEHOLDER_SCHEME}{}{}", self.host, self.path)
    }

    /// Signing region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Signing service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Unsigned query parameters, unencoded.
    #[must_use]
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    /// Headers to sign. Only `host`.
    #[must_use]
    pub fn headers(&self) -> [(&'static str, &str); 1] {
        [("host", self.host.as_str())]
    }
}
