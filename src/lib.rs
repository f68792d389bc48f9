//! # fhir-bundle-validator Library
//!
//! Streams FHIR bundle JSON files from a local directory or an S3 prefix,
//! validates each one against the requested schema variants and aggregates
//! the outcomes into one report per variant.

pub mod bundle;
pub mod cli;
pub mod config;
pub mod decompose;
pub mod error;
pub mod error_reporter;
pub mod fhir;
pub mod file_source;
pub mod object_store;
pub mod output;
pub mod report;
pub mod validator;

pub use bundle::{BundleValidator, SchemaVariant, ValidationIssue, ValidationOutcome};
pub use cli::{Cli, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use decompose::decompose;
pub use error::{BundleError, IngestionError, ReportError};
pub use error_reporter::ErrorReporter;
pub use fhir::FhirBundleValidator;
pub use file_source::{FileRecord, FileSource, LocalFileSource, RemoteFileSource};
pub use object_store::{ListPage, ObjectStore, S3Location, S3ObjectStore, S3Settings, StoredObject};
pub use output::Output;
pub use report::{ReportWriter, ValidationReport};
pub use validator::ValidationEngine;
