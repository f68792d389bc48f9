use std::time::Instant;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use fhir_bundle_validator::cli::{Cli, VerbosityLevel};
use fhir_bundle_validator::config::{Config, ConfigManager};
use fhir_bundle_validator::error_reporter::ErrorReporter;
use fhir_bundle_validator::output::Output;
use fhir_bundle_validator::report::ReportWriter;
use fhir_bundle_validator::validator::ValidationEngine;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse_normalized(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(error) => {
            init_tracing(cli.verbosity());
            ErrorReporter::new(cli.verbosity()).report(&anyhow::Error::new(error));
            std::process::exit(1);
        }
    };

    init_tracing(config.verbosity());
    let reporter = ErrorReporter::new(config.verbosity());

    if let Err(error) = run(config).await {
        reporter.report(&error);
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: VerbosityLevel) {
    let default_filter = match verbosity {
        VerbosityLevel::Quiet => "error",
        VerbosityLevel::Normal => "warn",
        VerbosityLevel::Verbose => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(config: Config) -> Result<()> {
    let variants = config.enabled_variants();
    if variants.is_empty() {
        tracing::warn!(
            "no schema variant enabled; pass --fhir3 (-stu3) and/or --fhir4 (-r4)"
        );
        return Ok(());
    }

    let output = Output::new(config.verbosity());
    let engine = ValidationEngine::with_builtin_validators(config.s3_settings())
        .with_output(output.clone());

    let started = Instant::now();
    let reports = engine
        .run(&config.source.directory, &variants, config.output.print)
        .await?;

    ReportWriter::new(&config.output.output_dir)
        .with_pretty(config.output.pretty)
        .write_all(&reports)
        .await?;

    print!("{}", output.format_results(&reports, started.elapsed()));
    Ok(())
}
