//! Error kinds shared by both resolvers
//!
//! Each variant is a distinct outcome the CLI reports to the user. Resolvers
//! never convert one kind into another: a registry that cannot be reached
//! is `RegistryUnavailable`, never `NotFound`.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the core crate
pub type Result<T, E = YolkError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum YolkError {
    /// No installed distribution or registry release matches the query
    #[error("{what}")]
    NotFound { what: String },

    /// The distribution is installed but carries no dependency metadata
    #[error("No dependency information was supplied with the package {name} {version}.")]
    NoDependencyData { name: String, version: String },

    /// Transport failure, timeout, unexpected status or malformed response
    #[error("Registry unavailable: {message}")]
    RegistryUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The local package metadata could not be enumerated
    #[error("Could not inspect installed packages: {message}")]
    Introspection {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration file exists but cannot be used
    #[error("Invalid configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl YolkError {
    pub fn not_found(what: impl Into<String>) -> Self {
        YolkError::NotFound { what: what.into() }
    }

    pub fn registry(message: impl Into<String>) -> Self {
        YolkError::RegistryUnavailable {
            message: message.into(),
            source: None,
        }
    }

    pub fn registry_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        YolkError::RegistryUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn introspection(message: impl Into<String>, source: std::io::Error) -> Self {
        YolkError::Introspection {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, YolkError::NotFound { .. })
    }
}

impl From<reqwest::Error> for YolkError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_decode() {
            "malformed response body".to_string()
        } else {
            err.to_string()
        };
        YolkError::registry_with(message, err)
    }
}
