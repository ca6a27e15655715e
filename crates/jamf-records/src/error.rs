use crate::provider::ProviderError;
use crate::registry::Operation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JamfError {
    #[error("{type_name} record not found: {key}")]
    RecordNotFound { type_name: String, key: String },

    #[error("Invalid path `{path}` at `{segment}`: {reason}")]
    InvalidPath {
        path: String,
        segment: String,
        reason: String,
    },

    #[error("Unknown record type: {0}")]
    UnknownType(String),

    #[error("Unexpected server response: {0}")]
    ApiSurprise(String),

    #[error("Name `{name}` matches {count} {type_name} records")]
    AmbiguousName {
        type_name: String,
        name: String,
        count: usize,
    },

    #[error("{type_name} record is missing required field `{path}`")]
    MissingField { type_name: String, path: String },

    #[error("{type_name} records do not support {operation}")]
    Unsupported {
        type_name: String,
        operation: Operation,
    },

    #[error("Invalid record data: {0}")]
    InvalidData(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Config error: {0}")]
    Config(String),
}

impl JamfError {
    pub(crate) fn not_found(type_name: &str, key: impl ToString) -> Self {
        JamfError::RecordNotFound {
            type_name: type_name.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid_path(
        path: impl Into<String>,
        segment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        JamfError::InvalidPath {
            path: path.into(),
            segment: segment.into(),
            reason: reason.into(),
        }
    }

    /// True when the server no longer knows about the record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            JamfError::RecordNotFound { .. } | JamfError::Provider(ProviderError::NotFound(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, JamfError>;
