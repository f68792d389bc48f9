//! Validator seam: schema variants, issues and per-file outcomes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::decompose::decompose;
use crate::error::BundleError;

/// Rule set a bundle can be checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// FHIR 3.0
    Stu3,
    /// FHIR 4.0
    R4,
}

impl SchemaVariant {
    pub const ALL: [SchemaVariant; 2] = [SchemaVariant::Stu3, SchemaVariant::R4];

    /// Stable identifier, used in report file names
    pub fn id(self) -> &'static str {
        match self {
            SchemaVariant::Stu3 => "stu3",
            SchemaVariant::R4 => "r4",
        }
    }

    /// Label used in console output
    pub fn label(self) -> &'static str {
        match self {
            SchemaVariant::Stu3 => "fhir3",
            SchemaVariant::R4 => "fhir4",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stu3" | "fhir3" => Ok(SchemaVariant::Stu3),
            "r4" | "fhir4" => Ok(SchemaVariant::R4),
            other => Err(format!("Unknown schema variant: {}", other)),
        }
    }
}

/// One rule violation found in a bundle that deserialized successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub member_path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(member_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            member_path: member_path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.member_path, self.message)
    }
}

/// A schema-aware bundle validator for one variant.
///
/// Implementations deserialize the document first and evaluate rules
/// second. A deserialization failure is returned as
/// [`BundleError::Deserialization`]; anything else that prevents validation
/// is [`BundleError::Unexpected`].
pub trait BundleValidator: Send + Sync {
    fn variant(&self) -> SchemaVariant;

    fn validate(&self, content: &str) -> Result<Vec<ValidationIssue>, BundleError>;
}

/// Per-file result: human-readable errors, empty on success
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

impl From<Result<Vec<ValidationIssue>, BundleError>> for ValidationOutcome {
    fn from(result: Result<Vec<ValidationIssue>, BundleError>) -> Self {
        let errors = match result {
            Ok(issues) => issues.iter().map(ToString::to_string).collect(),
            Err(BundleError::Deserialization { message }) => decompose(&message),
            Err(BundleError::Unexpected { kind, message }) => {
                vec![format!("Unexpected exception type: {} - {}", kind, message)]
            }
        };
        Self { errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_ids_and_parsing() {
        assert_eq!(SchemaVariant::Stu3.id(), "stu3");
        assert_eq!(SchemaVariant::R4.to_string(), "r4");
        assert_eq!("FHIR3".parse::<SchemaVariant>(), Ok(SchemaVariant::Stu3));
        assert_eq!("r4".parse::<SchemaVariant>(), Ok(SchemaVariant::R4));
        assert!("dstu2".parse::<SchemaVariant>().is_err());
    }

    #[test]
    fn test_outcome_from_issues() {
        let outcome = ValidationOutcome::from(Ok(vec![ValidationIssue::new(
            "Bundle.type",
            "Element with minimum cardinality 1 cannot be null",
        )]));
        assert_eq!(
            outcome.errors,
            vec!["Bundle.type: Element with minimum cardinality 1 cannot be null"]
        );

        assert!(ValidationOutcome::from(Ok(vec![])).is_success());
    }

    #[test]
    fn test_outcome_from_deserialization_failure() {
        let outcome = ValidationOutcome::from(Err(BundleError::Deserialization {
            message: "(err1) (err2)".to_string(),
        }));
        assert_eq!(outcome.errors, vec!["err1", "err2"]);
    }

    #[test]
    fn test_outcome_from_unexpected_failure() {
        let outcome = ValidationOutcome::from(Err(BundleError::Unexpected {
            kind: "RecursionLimit".to_string(),
            message: "too deep".to_string(),
        }));
        assert_eq!(
            outcome.into_errors(),
            vec!["Unexpected exception type: RecursionLimit - too deep"]
        );
    }
}
