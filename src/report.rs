//! Per-variant validation reports
//!
//! A [`ValidationReport`] is folded file by file while the engine streams a
//! source, then finalized once with [`ValidationReport::count_total_errors`]
//! and written by [`ReportWriter`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bundle::SchemaVariant;
use crate::error::{ReportError, ReportResult};

/// Aggregated results of validating one source against one schema variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Number of files processed
    #[serde(rename = "filesProceed")]
    pub files_processed: usize,
    /// Number of files with at least one error
    #[serde(rename = "filesWithErrors")]
    pub files_with_errors: usize,
    /// Sum of all error list lengths, valid after [`Self::count_total_errors`]
    #[serde(rename = "totalErrorCount")]
    pub total_error_count: usize,
    /// Error lists keyed by file identifier; files without errors are absent
    #[serde(rename = "validationResults")]
    pub validation_results: BTreeMap<String, Vec<String>>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one file.
    pub fn add(&mut self, identifier: impl Into<String>, errors: Vec<String>) {
        self.files_processed += 1;
        if !errors.is_empty() {
            self.files_with_errors += 1;
            self.validation_results.insert(identifier.into(), errors);
        }
    }

    /// Recompute `total_error_count` from the stored error lists.
    pub fn count_total_errors(&mut self) -> usize {
        self.total_error_count = self.validation_results.values().map(Vec::len).sum();
        self.total_error_count
    }

    /// Number of files that passed
    pub fn valid_files(&self) -> usize {
        self.files_processed - self.files_with_errors
    }

    pub fn has_errors(&self) -> bool {
        self.files_with_errors > 0
    }

    /// Get success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.files_processed == 0 {
            0.0
        } else {
            (self.valid_files() as f64 / self.files_processed as f64) * 100.0
        }
    }

    pub fn errors_for(&self, identifier: &str) -> Option<&[String]> {
        self.validation_results.get(identifier).map(Vec::as_slice)
    }
}

/// On-disk shape of a report file
#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    #[serde(rename = "schemaVersion")]
    schema_version: &'a str,
    #[serde(rename = "generatedAt")]
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a ValidationReport,
}

/// Writes one `report_<variant>.json` file per report
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    pretty: bool,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// File name used for a variant's report
    pub fn file_name(variant: SchemaVariant) -> String {
        format!("report_{}.json", variant.id())
    }

    /// Serialize a report without touching the filesystem
    pub fn render(&self, variant: SchemaVariant, report: &ValidationReport) -> ReportResult<String> {
        let document = ReportDocument {
            schema_version: variant.id(),
            generated_at: Utc::now(),
            report,
        };
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(rendered)
    }

    /// Write one report, creating the output directory if needed
    pub async fn write(
        &self,
        variant: SchemaVariant,
        report: &ValidationReport,
    ) -> ReportResult<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| ReportError::Io {
                path: self.output_dir.clone(),
                source,
            })?;

        let path = self.output_dir.join(Self::file_name(variant));
        let rendered = self.render(variant, report)?;
        tokio::fs::write(&path, rendered)
            .await
            .map_err(|source| ReportError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), variant = %variant, "report written");
        Ok(path)
    }

    /// Write every report in the map, in variant order
    pub async fn write_all(
        &self,
        reports: &BTreeMap<SchemaVariant, ValidationReport>,
    ) -> ReportResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(reports.len());
        for (variant, report) in reports {
            written.push(self.write(*variant, report).await?);
        }
        Ok(written)
    }
}
