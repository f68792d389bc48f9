//! Console output for per-file results and run summaries

use std::collections::BTreeMap;
use std::time::Duration;

use crate::bundle::SchemaVariant;
use crate::cli::VerbosityLevel;
use crate::report::ValidationReport;

const FILE_SEPARATOR: &str = "----------------------------------------";

/// Human-readable formatter for validation progress and results
#[derive(Debug, Clone)]
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Formatter that never emits ANSI escapes
    pub fn plain(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_file_header(&self, identifier: &str) -> String {
        format!("{}\nProcessing file: {}", FILE_SEPARATOR, identifier)
    }

    pub fn format_file_footer(&self, identifier: &str) -> String {
        format!("Processed file: {}\n{}", identifier, FILE_SEPARATOR)
    }

    /// One line per error, or a single success line naming the bundle id
    pub fn format_outcome(
        &self,
        variant: SchemaVariant,
        bundle_id: Option<&str>,
        errors: &[String],
    ) -> String {
        let mut output = format!("{}:", variant.label());
        if errors.is_empty() {
            let subject = match bundle_id {
                Some(id) => format!("Resource with id '{}'", id),
                None => "Resource".to_string(),
            };
            output.push_str(&format!(
                "\n  {} {} validated successfully",
                self.colorize("✓", "32"),
                subject
            ));
        } else {
            for error in errors {
                output.push_str(&format!("\n  {} {}", self.colorize("✗", "31"), error));
            }
        }
        output
    }

    pub fn format_summary(&self, variant: SchemaVariant, report: &ValidationReport) -> String {
        let mut output = format!("Validation Summary ({}):\n", variant.label());
        output.push_str(&format!("  Files processed: {}\n", report.files_processed));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Valid:", "32"),
            report.valid_files()
        ));

        if report.has_errors() {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("With errors:", "31"),
                report.files_with_errors
            ));
            output.push_str(&format!(
                "  Total errors: {}\n",
                report.total_error_count
            ));
        }

        output.push_str(&format!("  Success rate: {:.1}%\n", report.success_rate()));
        output
    }

    /// Summaries for every variant, or nothing when quiet
    pub fn format_results(
        &self,
        reports: &BTreeMap<SchemaVariant, ValidationReport>,
        duration: Duration,
    ) -> String {
        if self.verbosity == VerbosityLevel::Quiet {
            return String::new();
        }

        let mut output = String::new();
        for (variant, report) in reports {
            output.push_str(&self.format_summary(*variant, report));
        }
        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&format!("Duration: {}\n", format_duration(duration)));
        }
        output
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
