//! Core types and configuration for ecauth.
//!
//! This crate holds the pieces shared by the signing and token crates and the
//! command-line front end: the signing [`Region`], the [`CacheVariant`] of a
//! cache deployment, and the environment-driven [`EcAuthConfig`].

pub mod config;
mod error;
mod types;

pub use config::EcAuthConfig;
pub use error::{EcAuthError, EcAuthResult};
pub use types::{CacheVariant, Region};
