use crate::bundle::SchemaVariant;
use crate::cli::{Cli, VerbosityLevel};
use crate::file_source::is_remote_target;
use crate::object_store::{S3Location, S3Settings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const ENV_PREFIX: &str = "BUNDLE_VALIDATOR_";
const APP_NAME: &str = "fhir-bundle-validator";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub validation: ValidationConfig,
    pub output: OutputConfig,
}

/// Where bundles are read from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// Local directory or `s3://bucket/prefix`
    pub directory: String,
    /// Named AWS credential profile
    pub aws_profile: Option<String>,
    /// AWS region override
    pub aws_region: Option<String>,
}

/// Which schema variants to validate against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ValidationConfig {
    pub fhir3: bool,
    pub fhir4: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Print per-file results
    pub print: bool,
    /// Directory that receives `report_<variant>.json`
    pub output_dir: PathBuf,
    /// Indent report files
    pub pretty: bool,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            directory: "jsons".to_string(),
            aws_profile: None,
            aws_region: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            print: false,
            output_dir: PathBuf::from("."),
            pretty: true,
            verbose: false,
            quiet: false,
        }
    }
}

impl Config {
    /// Enabled variants in a stable order
    pub fn enabled_variants(&self) -> Vec<SchemaVariant> {
        let mut variants = Vec::new();
        if self.validation.fhir3 {
            variants.push(SchemaVariant::Stu3);
        }
        if self.validation.fhir4 {
            variants.push(SchemaVariant::R4);
        }
        variants
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.output.quiet {
            VerbosityLevel::Quiet
        } else if self.output.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            profile: self.source.aws_profile.clone(),
            region: self.source.aws_region.clone(),
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(&SystemEnvProvider, cli).await
    }

    /// Load configuration reading overrides from a custom environment provider
    pub async fn load_config_with(env: &impl EnvProvider, cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides_with(env, config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;
        tracing::debug!(path = %path.display(), "loading configuration file");

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                let config: Config = toml::from_str(&content)?;
                Ok(config)
            }
            Some("json") => {
                let config: Config = serde_json::from_str(&content)?;
                Ok(config)
            }
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    let config: Config = serde_json::from_str(&content)?;
                    Ok(config)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            format!("{}.toml", APP_NAME),
            format!("{}.json", APP_NAME),
            format!(".{}.toml", APP_NAME),
            format!(".{}.json", APP_NAME),
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join(APP_NAME);
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(directory) = env.get(&env_key("DIRECTORY")) {
            config.source.directory = directory;
        }
        if let Some(profile) = env.get(&env_key("AWS_PROFILE")) {
            config.source.aws_profile = Some(profile);
        }
        if let Some(region) = env.get(&env_key("AWS_REGION")) {
            config.source.aws_region = Some(region);
        }

        if let Some(fhir3) = env_bool(env, "FHIR3")? {
            config.validation.fhir3 = fhir3;
        }
        if let Some(fhir4) = env_bool(env, "FHIR4")? {
            config.validation.fhir4 = fhir4;
        }

        if let Some(output_dir) = env.get(&env_key("OUTPUT_DIR")) {
            config.output.output_dir = PathBuf::from(output_dir);
        }
        if let Some(print) = env_bool(env, "PRINT")? {
            config.output.print = print;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence).
    ///
    /// Boolean flags can only switch a setting on; an absent flag keeps the
    /// configured value.
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(directory) = &cli.directory {
            config.source.directory = directory.clone();
        }
        if let Some(profile) = &cli.aws_profile {
            config.source.aws_profile = Some(profile.clone());
        }
        if let Some(region) = &cli.aws_region {
            config.source.aws_region = Some(region.clone());
        }

        config.validation.fhir3 |= cli.fhir3;
        config.validation.fhir4 |= cli.fhir4;

        if let Some(output_dir) = &cli.output_dir {
            config.output.output_dir = output_dir.clone();
        }
        config.output.print |= cli.print;
        if cli.compact {
            config.output.pretty = false;
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Merge two configurations (second takes precedence for non-None values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        base.source.directory = override_config.source.directory;
        if override_config.source.aws_profile.is_some() {
            base.source.aws_profile = override_config.source.aws_profile;
        }
        if override_config.source.aws_region.is_some() {
            base.source.aws_region = override_config.source.aws_region;
        }

        base.validation = override_config.validation;
        base.output = override_config.output;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        let directory = config.source.directory.trim();
        if directory.is_empty() {
            return Err(ConfigError::Validation(
                "Source directory must not be empty".to_string(),
            ));
        }

        if is_remote_target(directory) {
            S3Location::parse(directory)
                .map_err(|e| ConfigError::Validation(e.to_string()))?;
        }

        if let Some(profile) = &config.source.aws_profile
            && profile.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "AWS profile name must not be empty".to_string(),
            ));
        }

        if let Some(region) = &config.source.aws_region
            && region.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "AWS region must not be empty".to_string(),
            ));
        }

        if config.output.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "Output directory must not be empty".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_key(name: &str) -> String {
    format!("{}{}", ENV_PREFIX, name)
}

fn env_bool(env: &impl EnvProvider, name: &str) -> Result<Option<bool>> {
    let key = env_key(name);
    env.get(&key)
        .map(|value| {
            value.trim().parse::<bool>().map_err(|_| {
                ConfigError::Environment(format!("Invalid {} value: {}", key, value))
            })
        })
        .transpose()
}
