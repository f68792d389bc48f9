use clap::Parser;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
}

/// Single-dash long flags accepted for compatibility, with their clap spelling
const LEGACY_FLAGS: &[(&str, &str)] = &[("-stu3", "--fhir3"), ("-r4", "--fhir4")];

/// Rewrite `-stu3` and `-r4` into their double-dash forms.
///
/// clap has no notion of multi-character short flags, so these are mapped
/// before parsing. Every other argument is passed through untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            LEGACY_FLAGS
                .iter()
                .find(|(legacy, _)| arg == *legacy)
                .map(|(_, canonical)| OsString::from(*canonical))
                .unwrap_or(arg)
        })
        .collect()
}

/// Batch validator for FHIR bundle JSON files
#[derive(Parser, Debug, Clone)]
#[command(name = "fhir-bundle-validator")]
#[command(about = "Validate FHIR bundle JSON files from a directory or an S3 prefix")]
#[command(version)]
pub struct Cli {
    /// Directory or s3://bucket/prefix to validate
    #[arg(
        short = 'd',
        long = "directory",
        help = "Directory or s3://bucket/prefix to validate [default: jsons]"
    )]
    pub directory: Option<String>,

    /// Validate against FHIR STU3 (also accepted as -stu3)
    #[arg(long = "fhir3", help = "Validate against FHIR STU3 (also -stu3)")]
    pub fhir3: bool,

    /// Validate against FHIR R4 (also accepted as -r4)
    #[arg(long = "fhir4", help = "Validate against FHIR R4 (also -r4)")]
    pub fhir4: bool,

    /// Print per-file results
    #[arg(short = 'p', long = "print", help = "Print per-file results")]
    pub print: bool,

    /// Directory that receives the report files
    #[arg(short = 'o', long = "output-dir", help = "Directory for report files [default: .]")]
    pub output_dir: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Named AWS credential profile for S3 targets
    #[arg(long = "aws-profile")]
    pub aws_profile: Option<String>,

    /// AWS region override for S3 targets
    #[arg(long = "aws-region")]
    pub aws_region: Option<String>,

    /// Write reports without indentation
    #[arg(long = "compact")]
    pub compact: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Cli {
    /// Parse arguments after legacy flag normalization
    pub fn try_parse_normalized<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}
