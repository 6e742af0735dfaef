//! Error types for the ecauth core.

/// Core error type for configuration and infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum EcAuthError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for ecauth core operations.
pub type EcAuthResult<T> = Result<T, EcAuthError>;
