//! Validation orchestration
//!
//! The [`ValidationEngine`] streams one [`FileSource`], runs every requested
//! schema variant's validator over each record and folds the outcomes into
//! one [`ValidationReport`] per variant. Files are processed one at a time;
//! only the current record's content is held in memory.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};

use crate::bundle::{BundleValidator, SchemaVariant, ValidationOutcome};
use crate::cli::VerbosityLevel;
use crate::error::{BundleError, IngestionError, Result};
use crate::fhir::{FhirBundleValidator, bundle_id};
use crate::file_source::{FileRecord, FileSource};
use crate::object_store::S3Settings;
use crate::output::Output;
use crate::report::ValidationReport;

/// Runs registered validators over a source and builds per-variant reports
pub struct ValidationEngine {
    validators: BTreeMap<SchemaVariant, Box<dyn BundleValidator>>,
    settings: S3Settings,
    output: Output,
}

impl ValidationEngine {
    /// Engine with no validators registered
    pub fn new(settings: S3Settings) -> Self {
        Self {
            validators: BTreeMap::new(),
            settings,
            output: Output::new(VerbosityLevel::Normal),
        }
    }

    /// Engine with the built-in FHIR validator registered for every variant
    pub fn with_builtin_validators(settings: S3Settings) -> Self {
        SchemaVariant::ALL
            .into_iter()
            .fold(Self::new(settings), |engine, variant| {
                engine.register(Box::new(FhirBundleValidator::new(variant)))
            })
    }

    /// Register a validator, replacing any previous one for its variant
    pub fn register(mut self, validator: Box<dyn BundleValidator>) -> Self {
        self.validators.insert(validator.variant(), validator);
        self
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn supports(&self, variant: SchemaVariant) -> bool {
        self.validators.contains_key(&variant)
    }

    /// Open a source for `target` and validate everything it yields.
    ///
    /// Duplicate variants are collapsed. Fails before opening the source when
    /// a requested variant has no validator.
    pub async fn run(
        &self,
        target: &str,
        variants: &[SchemaVariant],
        print_to_console: bool,
    ) -> Result<BTreeMap<SchemaVariant, ValidationReport>> {
        let variants = self.requested(variants)?;
        tracing::info!(
            target = %target,
            variants = ?variants,
            "starting validation run"
        );

        let source = FileSource::open(target, &self.settings).await?;
        self.drain(source, &variants, print_to_console).await
    }

    /// Validate everything an already opened source yields
    pub async fn run_source(
        &self,
        source: FileSource,
        variants: &[SchemaVariant],
        print_to_console: bool,
    ) -> Result<BTreeMap<SchemaVariant, ValidationReport>> {
        let variants = self.requested(variants)?;
        self.drain(source, &variants, print_to_console).await
    }

    /// Validate one document against one registered variant
    pub fn validate_content(&self, variant: SchemaVariant, content: &str) -> Result<ValidationOutcome> {
        let validator = self
            .validators
            .get(&variant)
            .ok_or_else(|| IngestionError::UnsupportedVariant {
                variant: variant.to_string(),
            })?;
        Ok(ValidationOutcome::from(guarded_validate(
            validator.as_ref(),
            content,
        )))
    }

    fn requested(&self, variants: &[SchemaVariant]) -> Result<BTreeSet<SchemaVariant>> {
        let requested: BTreeSet<SchemaVariant> = variants.iter().copied().collect();
        if let Some(missing) = requested.iter().find(|v| !self.supports(**v)) {
            return Err(IngestionError::UnsupportedVariant {
                variant: missing.to_string(),
            });
        }
        Ok(requested)
    }

    async fn drain(
        &self,
        mut source: FileSource,
        variants: &BTreeSet<SchemaVariant>,
        print_to_console: bool,
    ) -> Result<BTreeMap<SchemaVariant, ValidationReport>> {
        let mut reports: BTreeMap<SchemaVariant, ValidationReport> = variants
            .iter()
            .map(|variant| (*variant, ValidationReport::new()))
            .collect();

        let result = self
            .fold_records(&mut source, &mut reports, print_to_console)
            .await;
        source.close();
        result?;

        for (variant, report) in reports.iter_mut() {
            let total = report.count_total_errors();
            tracing::info!(
                variant = %variant,
                files = report.files_processed,
                files_with_errors = report.files_with_errors,
                total_errors = total,
                "variant finished"
            );
        }
        Ok(reports)
    }

    async fn fold_records(
        &self,
        source: &mut FileSource,
        reports: &mut BTreeMap<SchemaVariant, ValidationReport>,
        print_to_console: bool,
    ) -> Result<()> {
        while let Some(record) = source.next_record().await? {
            self.process_record(record, reports, print_to_console)?;
        }
        Ok(())
    }

    fn process_record(
        &self,
        record: FileRecord,
        reports: &mut BTreeMap<SchemaVariant, ValidationReport>,
        print_to_console: bool,
    ) -> Result<()> {
        let (identifier, content) = record.into_parts();
        tracing::debug!(file = %identifier, bytes = content.len(), "validating file");
        let shown_id = if print_to_console {
            println!("{}", self.output.format_file_header(&identifier));
            bundle_id(&content)
        } else {
            None
        };

        for (variant, report) in reports.iter_mut() {
            let errors = self.validate_content(*variant, &content)?.into_errors();
            if print_to_console {
                println!(
                    "{}",
                    self.output
                        .format_outcome(*variant, shown_id.as_deref(), &errors)
                );
            }
            report.add(identifier.clone(), errors);
        }

        if print_to_console {
            println!("{}", self.output.format_file_footer(&identifier));
        }
        Ok(())
    }
}

/// Run a validator, turning a panic inside it into [`BundleError::Unexpected`]
fn guarded_validate(
    validator: &dyn BundleValidator,
    content: &str,
) -> std::result::Result<Vec<crate::bundle::ValidationIssue>, BundleError> {
    panic::catch_unwind(AssertUnwindSafe(|| validator.validate(content))).unwrap_or_else(
        |payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "validator panicked".to_string());
            Err(BundleError::Unexpected {
                kind: "Panic".to_string(),
                message,
            })
        },
    )
}
