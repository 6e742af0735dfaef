//! ecauth - print an IAM authentication token for an ElastiCache endpoint.
//!
//! Resolves AWS credentials through the default provider chain (environment, profile,
//! web identity, container and instance metadata), signs a connect token for the
//! configured cache and user, and prints it to stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! ecauth [ENDPOINT] [PORT] [--json]
//! ```
//!
//! Positional arguments override `ELASTICACHE_ENDPOINT` and `ELASTICACHE_PORT`.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ELASTICACHE_ENDPOINT` | *(required)* | Cache endpoint hostname |
//! | `ELASTICACHE_PORT` | `6379` | Cache port |
//! | `ELASTICACHE_USER` | `iam-user` | IAM-enabled cache user id |
//! | `ELASTICACHE_CACHE_NAME` | *(unset)* | Explicit resource name |
//! | `ELASTICACHE_SERVERLESS` | *(inferred)* | Force the serverless (`true`) or cluster (`false`) variant |
//! | `AWS_REGION` | `us-east-1` | Signing region |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use chrono::{DateTime, Utc};
use ecauth_core::EcAuthConfig;
use ecauth_sigv4::{Credentials, StaticCredentialSource};
use ecauth_token::{AuthToken, ClientAuthConfig, IamAuthConfig};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: ecauth [ENDPOINT] [PORT] [--json]";

/// Initialize the tracing subscriber on stderr.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Parsed command-line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    endpoint: Option<String>,
    port: Option<String>,
    json: bool,
    help: bool,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Self::default();
        let mut positional = Vec::new();
        for arg in args {
            match arg.as_str() {
                "--json" => parsed.json = true,
                "-h" | "--help" => parsed.help = true,
                flag if flag.starts_with('-') => bail!("unknown option: {flag}\n{USAGE}"),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        parsed.endpoint = positional.next();
        parsed.port = positional.next();
        if let Some(extra) = positional.next() {
            bail!("unexpected argument: {extra}\n{USAGE}");
        }
        Ok(parsed)
    }

    /// Overlay arguments on configuration. An unparsable port keeps the configured one.
    fn apply(&self, config: &mut EcAuthConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if let Some(port) = &self.port {
            match port.parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => warn!(value = %port, port = config.port, "invalid port, keeping configured port"),
            }
        }
    }
}

/// Token printed with `--json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenOutput<'a> {
    user: &'a str,
    token: &'a str,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    cache_name: &'a str,
    variant: &'static str,
}

impl<'a> TokenOutput<'a> {
    fn new(auth: &'a IamAuthConfig, token: &'a AuthToken) -> Self {
        Self {
            user: auth.user(),
            token: token.value(),
            issued_at: token.issued_at(),
            expires_at: token.expires_at(),
            cache_name: auth.identity().name(),
            variant: auth.identity().variant().as_str(),
        }
    }
}

/// Resolve credentials once from the AWS default provider chain.
async fn load_credentials(config: &EcAuthConfig) -> Result<Credentials> {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.as_str().to_owned()))
        .load()
        .await;
    let provider = sdk_config
        .credentials_provider()
        .context("no AWS credentials provider is configured")?;
    let credentials = provider
        .provide_credentials()
        .await
        .context("failed to resolve AWS credentials")?;
    Ok(credentials.into())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut config = EcAuthConfig::from_env();
    init_tracing(&config.log_level)?;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    info!(
        endpoint = %config.endpoint,
        port = config.port,
        user = %config.user,
        region = %config.region,
        "generating IAM auth token"
    );

    let credentials = load_credentials(&config).await?;
    info!(access_key_id = %credentials.masked_access_key_id(), "resolved AWS credentials");

    let source = StaticCredentialSource::new(credentials);
    let auth = IamAuthConfig::from_config(&config, Arc::new(source))
        .context("cannot resolve cache identity")?;
    let token = auth.token().context("failed to generate auth token")?;

    info!(
        cache = %auth.identity().name(),
        variant = %auth.identity().variant(),
        expires_at = %token.expires_at(),
        "issued auth token"
    );

    if args.json {
        println!("{}", serde_json::to_string(&TokenOutput::new(&auth, &token))?);
    } else {
        println!("{token}");
    }

    Ok(())
}
