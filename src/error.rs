//! Error types
//!
//! Every fallible operation in seedbed returns [`Result`], so callers can tell
//! a misconfigured database apart from a driver failure or a builder that
//! never supplied its build logic.

use thiserror::Error;

/// Errors raised by builders, the config resolver, the cleaner and the
/// fixture loader.
#[derive(Debug, Error)]
pub enum Error {
    /// A blueprint did not supply build logic.
    #[error("build is not implemented for {0}")]
    NotImplemented(String),

    /// An option name the builder's schema does not declare.
    #[error("unknown option '{option}' for {builder}")]
    UnknownOption { builder: String, option: String },

    /// A coercion step rejected a value, or a stored value could not be read
    /// back as the requested type.
    #[error("invalid value for option '{option}': {message}")]
    InvalidOption { option: String, message: String },

    /// The database or the fixture directory could not be configured.
    ///
    /// The message is the full, caller-facing description.
    #[error("{0}")]
    DatabaseNotConfigured(String),

    /// The driver could not open a connection for a validated config.
    #[error("failed to connect to database '{database}': {message}")]
    Connection { database: String, message: String },

    /// A query against an open connection failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A fixture file is malformed.
    #[error("invalid fixture file {path}: {message}")]
    Fixture { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A fixture file is not valid YAML.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Loading [`SeedbedConfig`](crate::SeedbedConfig) failed.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Failure raised by user-supplied build logic.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn invalid_option(option: &str, message: impl Into<String>) -> Self {
        Error::InvalidOption {
            option: option.to_string(),
            message: message.into(),
        }
    }

    /// Whether this is the "database not configured" kind.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Error::DatabaseNotConfigured(_))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_message_is_verbatim() {
        let error = Error::DatabaseNotConfigured(
            "Unable to connect to database: Missing config for adapter".to_string(),
        );
        assert!(error.is_not_configured());
        assert_eq!(
            error.to_string(),
            "Unable to connect to database: Missing config for adapter"
        );
    }

    #[test]
    fn test_anyhow_is_transparent() {
        let error: Error = anyhow::anyhow!("user build failed").into();
        assert!(matches!(error, Error::Other(_)));
        assert_eq!(error.to_string(), "user build failed");
    }

    #[test]
    fn test_io_error_from() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
        assert!(!error.is_not_configured());
    }
}
