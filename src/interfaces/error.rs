use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or disallowed input, raised while building a configuration.
    Validation,
    /// A well-formed value that names something unsupported or is missing a required key.
    Configuration,
    /// The external credential provider failed.
    Provider,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Secret is missing the required 'type' field")]
    MissingSecretType,

    #[error("Unsupported secret type: {0}")]
    UnsupportedSecretType(String),

    #[error("Unsupported field '{field}' for secret type {secret_type}")]
    UnsupportedSecretField { secret_type: String, field: String },

    #[error("Invalid value for secret field '{field}': expected a string, number or boolean")]
    InvalidSecretValue { field: String },

    #[error("Attachment path must not be empty")]
    EmptyAttachmentPath,

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(#[source] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(
        "Inconsistency detected between 'path' and 'database' fields: database '{database}' does not match '{path_database}' derived from path"
    )]
    DatabaseMismatch { database: String, path_database: String },

    #[error("Unsupported credential provider: {0}")]
    UnsupportedCredentialProvider(String),

    #[error("Missing required argument '{key}' for {operation}")]
    MissingRequiredKey { key: String, operation: String },

    #[error("Failed to read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown plugin module: {0}")]
    UnknownPlugin(String),

    #[error("Plugin alias '{0}' is configured more than once")]
    DuplicatePlugin(String),

    #[error("Credential provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingSecretType
            | Error::UnsupportedSecretType(_)
            | Error::UnsupportedSecretField { .. }
            | Error::InvalidSecretValue { .. }
            | Error::EmptyAttachmentPath
            | Error::InvalidAttachment(_)
            | Error::InvalidConfiguration(_)
            | Error::DatabaseMismatch { .. } => ErrorKind::Validation,
            Error::UnsupportedCredentialProvider(_)
            | Error::MissingRequiredKey { .. }
            | Error::Io { .. }
            | Error::UnknownPlugin(_)
            | Error::DuplicatePlugin(_) => ErrorKind::Configuration,
            Error::Provider { .. } => ErrorKind::Provider,
        }
    }

    pub(crate) fn missing_key(key: &str, operation: &str) -> Self {
        Error::MissingRequiredKey {
            key: key.to_string(),
            operation: operation.to_string(),
        }
    }
}
