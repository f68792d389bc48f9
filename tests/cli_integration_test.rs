mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::test_helpers::*;
use tempfile::TempDir;

const ENV_OVERRIDES: &[&str] = &[
    "BUNDLE_VALIDATOR_DIRECTORY",
    "BUNDLE_VALIDATOR_AWS_PROFILE",
    "BUNDLE_VALIDATOR_AWS_REGION",
    "BUNDLE_VALIDATOR_OUTPUT_DIR",
    "BUNDLE_VALIDATOR_PRINT",
    "BUNDLE_VALIDATOR_FHIR3",
    "BUNDLE_VALIDATOR_FHIR4",
    "RUST_LOG",
];

/// Run the binary inside `workdir` with a clean environment
fn run_cli(workdir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_fhir-bundle-validator"));
    command
        .args(args)
        .current_dir(workdir)
        .env("HOME", workdir)
        .env("XDG_CONFIG_HOME", workdir.join(".config"));
    for key in ENV_OVERRIDES {
        command.env_remove(key);
    }
    command.output().expect("Failed to execute command")
}

fn report_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("report_"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_cli_help_output() {
    let workdir = TempDir::new().unwrap();
    let output = run_cli(workdir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("--directory"));
    assert!(stdout.contains("--fhir3"));
    assert!(stdout.contains("--fhir4"));
    assert!(stdout.contains("--print"));
    assert!(stdout.contains("--output-dir"));
}

#[test]
fn test_unknown_flag_aborts_without_reports() {
    let workdir = TempDir::new().unwrap();
    std::fs::create_dir(workdir.path().join("jsons")).unwrap();
    std::fs::write(workdir.path().join("jsons").join("a.json"), VALID_COLLECTION).unwrap();

    let output = run_cli(workdir.path(), &["-r4", "--bogus"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("--bogus"));
    assert!(report_files(workdir.path()).is_empty());
}

#[test]
fn test_default_directory_and_report() {
    let workdir = TempDir::new().unwrap();
    let jsons = workdir.path().join("jsons");
    std::fs::create_dir(&jsons).unwrap();
    std::fs::write(jsons.join("valid.json"), VALID_COLLECTION).unwrap();
    std::fs::write(jsons.join("broken.json"), NOT_JSON).unwrap();

    let output = run_cli(workdir.path(), &["-r4"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(report_files(workdir.path()), vec!["report_r4.json"]);

    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(workdir.path().join("report_r4.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report["filesProceed"], 2);
    assert_eq!(report["filesWithErrors"], 1);
    assert_eq!(report["totalErrorCount"], 1);

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Validation Summary (fhir4):"));
}

#[test]
fn test_print_and_output_dir() {
    let workdir = TempDir::new().unwrap();
    let bundles = workdir.path().join("bundles");
    std::fs::create_dir(&bundles).unwrap();
    std::fs::write(bundles.join("missing_type.json"), MISSING_TYPE).unwrap();

    let output = run_cli(
        workdir.path(),
        &["-d", "bundles", "-stu3", "-r4", "-p", "-o", "out", "--compact"],
    );
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Processing file:"));
    assert!(stdout.contains("fhir3:"));
    assert!(stdout.contains("fhir4:"));
    assert!(stdout.contains("Bundle.type: Element with minimum cardinality 1 cannot be null"));

    assert_eq!(
        report_files(&workdir.path().join("out")),
        vec!["report_r4.json", "report_stu3.json"]
    );
    let compact = std::fs::read_to_string(workdir.path().join("out").join("report_stu3.json")).unwrap();
    assert!(!compact.contains('\n'));
}

#[test]
fn test_no_variant_warns_and_succeeds() {
    let workdir = TempDir::new().unwrap();

    let output = run_cli(workdir.path(), &["-d", "does-not-exist"]);

    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("--fhir3"));
    assert!(report_files(workdir.path()).is_empty());
}

#[test]
fn test_missing_directory_is_fatal() {
    let workdir = TempDir::new().unwrap();

    let output = run_cli(workdir.path(), &["-d", "does-not-exist", "--fhir4"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Directory does not exist"));
    assert!(stderr.contains("Suggestion:"));
    assert!(report_files(workdir.path()).is_empty());
}

#[test]
fn test_environment_enables_variant() {
    let workdir = TempDir::new().unwrap();
    std::fs::create_dir(workdir.path().join("jsons")).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_fhir-bundle-validator"))
        .current_dir(workdir.path())
        .env("HOME", workdir.path())
        .env("XDG_CONFIG_HOME", workdir.path().join(".config"))
        .env("BUNDLE_VALIDATOR_FHIR3", "true")
        .env_remove("BUNDLE_VALIDATOR_DIRECTORY")
        .env_remove("BUNDLE_VALIDATOR_OUTPUT_DIR")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert_eq!(report_files(workdir.path()), vec!["report_stu3.json"]);
}

#[test]
fn test_config_file_quiet_applies_to_error_detail() {
    let workdir = TempDir::new().unwrap();
    std::fs::write(
        workdir.path().join("fhir-bundle-validator.toml"),
        "[source]\ndirectory = \"does-not-exist\"\n\n[validation]\nfhir4 = true\n\n[output]\nquiet = true\n",
    )
    .unwrap();

    let output = run_cli(workdir.path(), &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Directory does not exist"));
    assert!(!stderr.contains("Suggestion:"));
}

#[test]
fn test_config_file_verbose_raises_log_level() {
    let workdir = TempDir::new().unwrap();
    std::fs::create_dir(workdir.path().join("jsons")).unwrap();
    std::fs::write(
        workdir.path().join("fhir-bundle-validator.toml"),
        "[output]\nverbose = true\n",
    )
    .unwrap();

    let output = run_cli(workdir.path(), &["-r4"]);

    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("starting validation run"));
}

#[test]
fn test_print_names_valid_bundle_id() {
    let workdir = TempDir::new().unwrap();
    let jsons = workdir.path().join("jsons");
    std::fs::create_dir(&jsons).unwrap();
    std::fs::write(jsons.join("valid.json"), VALID_COLLECTION).unwrap();

    let output = run_cli(workdir.path(), &["-r4", "-p"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Resource with id 'bundle-example' validated successfully"));
}
