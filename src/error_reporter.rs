use crate::cli::VerbosityLevel;
use crate::config::ConfigError;
use crate::error::{IngestionError, ReportError};

/// Formats fatal errors for the operator, with a remediation hint where one
/// applies
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
}

impl ErrorReporter {
    /// Create a new error reporter with specified verbosity
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    /// Report any fatal error reaching the binary boundary
    pub fn report(&self, error: &anyhow::Error) {
        eprintln!("{}", self.format(error));
    }

    pub fn format(&self, error: &anyhow::Error) -> String {
        if let Some(ingestion) = error.downcast_ref::<IngestionError>() {
            self.format_ingestion_error(ingestion)
        } else if let Some(config) = error.downcast_ref::<ConfigError>() {
            self.format_config_error(config)
        } else if let Some(report) = error.downcast_ref::<ReportError>() {
            self.format_report_error(report)
        } else {
            self.decorate("Error", &format!("{:#}", error), None, &**error)
        }
    }

    pub fn format_ingestion_error(&self, error: &IngestionError) -> String {
        self.decorate(
            "Ingestion Error",
            &error.to_string(),
            ingestion_hint(error),
            error,
        )
    }

    pub fn format_config_error(&self, error: &ConfigError) -> String {
        self.decorate(
            "Configuration Error",
            &error.to_string(),
            Some(config_hint(error)),
            error,
        )
    }

    pub fn format_report_error(&self, error: &ReportError) -> String {
        let hint = match error {
            ReportError::Io { .. } => {
                Some("Check that the output directory (-o/--output-dir) is writable")
            }
            ReportError::Serialize(_) => None,
        };
        self.decorate("Report Error", &error.to_string(), hint, error)
    }

    fn decorate(
        &self,
        label: &str,
        message: &str,
        hint: Option<&str>,
        error: &(dyn std::error::Error + 'static),
    ) -> String {
        let mut output = format!("{}: {}", label, message);
        if self.verbosity == VerbosityLevel::Quiet {
            return output;
        }

        if let Some(hint) = hint {
            output.push_str(&format!("\nSuggestion: {}", hint));
        }

        if self.verbosity >= VerbosityLevel::Verbose {
            let mut current_error: &dyn std::error::Error = error;
            let mut level = 0;
            while let Some(source) = current_error.source() {
                if level == 0 {
                    output.push_str("\nError Chain:");
                }
                output.push_str(&format!("\n  {}: {}", level + 1, source));
                current_error = source;
                level += 1;
            }
        }

        output
    }
}

fn ingestion_hint(error: &IngestionError) -> Option<&'static str> {
    match error {
        IngestionError::DirectoryNotFound { .. } => Some(
            "Pass an existing directory with -d/--directory (the default is 'jsons' in the working directory)",
        ),
        IngestionError::Io { .. } => Some("Check file permissions on the source directory"),
        IngestionError::InvalidRemoteUri { .. } => {
            Some("Remote targets look like s3://bucket/prefix")
        }
        IngestionError::Credentials { .. } => Some(
            "Pass --aws-profile with a profile from ~/.aws/credentials, or run on an instance with an attached role",
        ),
        IngestionError::Listing { .. } => {
            Some("Check the bucket name, the prefix and the s3:ListBucket permission")
        }
        IngestionError::Fetch { .. } => Some("Check the s3:GetObject permission for the prefix"),
        IngestionError::UnsupportedVariant { .. } => {
            Some("Enable only supported variants with --fhir3 or --fhir4")
        }
        IngestionError::Exhausted => None,
    }
}

fn config_hint(error: &ConfigError) -> &'static str {
    match error {
        ConfigError::Io(_) => "Check that the file passed to -c/--config exists and is readable",
        ConfigError::TomlParsing(_) | ConfigError::JsonParsing(_) => {
            "Check the configuration file syntax (TOML/JSON format expected)"
        }
        ConfigError::UnsupportedFormat(_) => "Use a .toml or .json configuration file",
        ConfigError::Environment(_) => {
            "BUNDLE_VALIDATOR_* boolean variables accept 'true' or 'false'"
        }
        ConfigError::Validation(_) => {
            "Resolve conflicting configuration values between file, environment, and CLI"
        }
    }
}
