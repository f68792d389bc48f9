use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures while opening or advancing a file source.
///
/// These abort the run: no report is produced for the affected target.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Directory does not exist: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("IO error: {path} - {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid remote storage URI: {uri} - {reason}")]
    InvalidRemoteUri { uri: String, reason: String },

    #[error("Credential resolution failed: {details}")]
    Credentials { details: String },

    #[error("Object listing failed: s3://{bucket}/{prefix} - {details}")]
    Listing {
        bucket: String,
        prefix: String,
        details: String,
    },

    #[error("Object fetch failed: s3://{bucket}/{key} - {details}")]
    Fetch {
        bucket: String,
        key: String,
        details: String,
    },

    #[error("File source is exhausted")]
    Exhausted,

    #[error("No validator registered for schema variant: {variant}")]
    UnsupportedVariant { variant: String },
}

impl IngestionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestionError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Per-file failures raised by a bundle validator.
///
/// Never fatal: the engine folds them into the report and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BundleError {
    /// The document could not be deserialized as a bundle. The message may
    /// encode several problems, see [`crate::decompose`].
    #[error("Deserialization failed: {message}")]
    Deserialization { message: String },

    /// Anything else the validator could not handle.
    #[error("{kind} - {message}")]
    Unexpected { kind: String, message: String },
}

/// Failures while writing report artifacts
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestionError>;

/// Report result type alias
pub type ReportResult<T> = std::result::Result<T, ReportError>;
