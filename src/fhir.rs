//! Built-in FHIR JSON bundle validator
//!
//! Works in two phases. The deserialization phase checks the bundle's shape
//! (resource type, known elements, JSON kinds) and reports every problem it
//! finds as one compound [`BundleError::Deserialization`] message. The rule
//! phase runs only on a well-shaped bundle and evaluates the `bdl-*`
//! invariants, returning one [`ValidationIssue`] per violation.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::bundle::{BundleValidator, SchemaVariant, ValidationIssue};
use crate::error::BundleError;

const BUNDLE_TYPES: &[&str] = &[
    "document",
    "message",
    "transaction",
    "transaction-response",
    "batch",
    "batch-response",
    "history",
    "searchset",
    "collection",
];

const STU3_BUNDLE_ELEMENTS: &[&str] = &[
    "resourceType",
    "id",
    "meta",
    "implicitRules",
    "language",
    "identifier",
    "type",
    "total",
    "link",
    "entry",
    "signature",
];

const R4_ONLY_BUNDLE_ELEMENTS: &[&str] = &["timestamp"];

const ENTRY_ELEMENTS: &[&str] = &[
    "id",
    "extension",
    "modifierExtension",
    "link",
    "fullUrl",
    "resource",
    "search",
    "request",
    "response",
];

static FULL_URL_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_full_url_regex() -> &'static Regex {
    FULL_URL_REGEX.get_or_init(|| {
        Regex::new(concat!(
            r"^(urn:uuid:[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
            r"|urn:oid:[0-2](\.(0|[1-9][0-9]*))+",
            r"|[A-Za-z][A-Za-z0-9+.-]*://\S+)$"
        ))
        .expect("Failed to compile fullUrl regex")
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validates FHIR JSON bundles against one schema variant
#[derive(Debug, Clone)]
pub struct FhirBundleValidator {
    variant: SchemaVariant,
}

impl FhirBundleValidator {
    pub fn new(variant: SchemaVariant) -> Self {
        Self { variant }
    }

    fn is_bundle_element(&self, name: &str) -> bool {
        STU3_BUNDLE_ELEMENTS.contains(&name)
            || (self.variant == SchemaVariant::R4 && R4_ONLY_BUNDLE_ELEMENTS.contains(&name))
    }

    fn parse(content: &str) -> Result<Value, BundleError> {
        serde_json::from_str(content).map_err(|e| {
            if e.to_string().starts_with("recursion limit exceeded") {
                BundleError::Unexpected {
                    kind: "RecursionLimitExceeded".to_string(),
                    message: e.to_string(),
                }
            } else {
                BundleError::Deserialization {
                    message: format!("Invalid JSON encountered: ({})", e),
                }
            }
        })
    }

    /// Shape checks. Returns the bundle object when no problem was found.
    fn deserialize<'a>(&self, value: &'a Value) -> Result<&'a Map<String, Value>, BundleError> {
        let Value::Object(bundle) = value else {
            return Err(compound_failure(vec![format!(
                "The root of a FHIR JSON document must be an object, found {}",
                kind_of(value)
            )]));
        };

        let mut problems = Vec::new();

        match bundle.get("resourceType") {
            None => problems.push("Resource is missing the 'resourceType' element".to_string()),
            Some(Value::String(resource_type)) if resource_type == "Bundle" => {}
            Some(Value::String(resource_type)) => problems.push(format!(
                "Expected a 'Bundle' resource, found '{}'",
                resource_type
            )),
            Some(other) => problems.push(format!(
                "Element 'resourceType' must be a string, found {}",
                kind_of(other)
            )),
        }

        for (name, element) in bundle {
            let base = name.strip_prefix('_').unwrap_or(name);
            if !self.is_bundle_element(base) || (base == "resourceType" && name.starts_with('_')) {
                problems.push(format!(
                    "Encountered unknown element '{}' at location 'Bundle.{}'",
                    name, name
                ));
                continue;
            }
            if name.starts_with('_') {
                continue;
            }

            let path = format!("Bundle.{}", name);
            match name.as_str() {
                "id" | "implicitRules" | "language" | "type" | "timestamp" => {
                    expect_kind(&mut problems, &path, element, "a string", Value::is_string)
                }
                "total" => expect_kind(
                    &mut problems,
                    &path,
                    element,
                    "a non-negative integer",
                    Value::is_u64,
                ),
                "meta" | "identifier" | "signature" => {
                    expect_kind(&mut problems, &path, element, "an object", Value::is_object)
                }
                "link" => expect_kind(&mut problems, &path, element, "an array", Value::is_array),
                "entry" => match element.as_array() {
                    Some(entries) => {
                        for (index, entry) in entries.iter().enumerate() {
                            check_entry_shape(&mut problems, index, entry);
                        }
                    }
                    None => problems.push(format!(
                        "Element '{}' must be an array, found {}",
                        path,
                        kind_of(element)
                    )),
                },
                _ => {}
            }
        }

        if problems.is_empty() {
            Ok(bundle)
        } else {
            Err(compound_failure(problems))
        }
    }

    /// `bdl-*` invariants and code bindings on a well-shaped bundle
    fn check_rules(&self, bundle: &Map<String, Value>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let bundle_type = bundle.get("type").and_then(Value::as_str);
        let bundle_type = match bundle_type {
            None => {
                issues.push(ValidationIssue::new(
                    "Bundle.type",
                    "Element with minimum cardinality 1 cannot be null",
                ));
                None
            }
            Some(code) if !BUNDLE_TYPES.contains(&code) => {
                issues.push(ValidationIssue::new(
                    "Bundle.type",
                    format!("Value '{}' is not a valid code for BundleType", code),
                ));
                None
            }
            Some(code) => Some(code),
        };

        if let Some(code) = bundle_type
            && bundle.contains_key("total")
            && code != "searchset"
            && code != "history"
        {
            issues.push(ValidationIssue::new(
                "Bundle",
                "bdl-1: total only when a search or history",
            ));
        }

        let entries: &[Value] = bundle
            .get("entry")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let mut seen_full_urls = HashSet::new();

        for (index, entry) in entries.iter().enumerate() {
            let Some(entry) = entry.as_object() else {
                continue;
            };
            let path = format!("Bundle.entry[{}]", index);
            let has = |name: &str| entry.contains_key(name);

            if let Some(code) = bundle_type {
                if has("search") && code != "searchset" {
                    issues.push(ValidationIssue::new(
                        &path,
                        "bdl-2: entry.search only when a search",
                    ));
                }

                let allows_request = matches!(code, "batch" | "transaction" | "history");
                if self.variant == SchemaVariant::R4 {
                    if has("request") != allows_request {
                        issues.push(ValidationIssue::new(
                            &path,
                            "bdl-3: entry.request mandatory for batch/transaction/history, otherwise prohibited",
                        ));
                    }
                } else if has("request") && !allows_request {
                    issues.push(ValidationIssue::new(
                        &path,
                        "bdl-3: entry.request only for some types of bundles",
                    ));
                }

                let allows_response =
                    matches!(code, "batch-response" | "transaction-response" | "history");
                if self.variant == SchemaVariant::R4 {
                    if has("response") != allows_response {
                        issues.push(ValidationIssue::new(
                            &path,
                            "bdl-4: entry.response mandatory for batch-response/transaction-response/history, otherwise prohibited",
                        ));
                    }
                } else if has("response") && !allows_response {
                    issues.push(ValidationIssue::new(
                        &path,
                        "bdl-4: entry.response only if this is a batch-response, history or transaction-response",
                    ));
                }
            }

            if !has("resource") && !has("request") && !has("response") {
                issues.push(ValidationIssue::new(
                    &path,
                    "bdl-5: must be a resource unless there's a request or response",
                ));
            }

            if let Some(full_url) = entry.get("fullUrl").and_then(Value::as_str) {
                if !get_full_url_regex().is_match(full_url) {
                    issues.push(ValidationIssue::new(
                        format!("{}.fullUrl", path),
                        format!("Value '{}' is not a valid absolute URI", full_url),
                    ));
                }
                if bundle_type != Some("history") && !seen_full_urls.insert(full_url) {
                    issues.push(ValidationIssue::new(
                        &path,
                        "bdl-7: FullUrl must be unique in a bundle",
                    ));
                }
            }
        }

        match bundle_type {
            Some("document") => {
                if !has_identifier_with_system_and_value(bundle) {
                    issues.push(ValidationIssue::new(
                        "Bundle",
                        "bdl-9: A document must have an identifier with a system and a value",
                    ));
                }
                if self.variant == SchemaVariant::R4 && !bundle.contains_key("timestamp") {
                    issues.push(ValidationIssue::new(
                        "Bundle",
                        "bdl-10: A document must have a date",
                    ));
                }
                if first_resource_type(entries) != Some("Composition") {
                    issues.push(ValidationIssue::new(
                        "Bundle",
                        "bdl-11: A document must have a Composition as the first resource",
                    ));
                }
            }
            Some("message") => {
                if first_resource_type(entries) != Some("MessageHeader") {
                    issues.push(ValidationIssue::new(
                        "Bundle",
                        "bdl-12: A message must have a MessageHeader as the first resource",
                    ));
                }
            }
            _ => {}
        }

        issues
    }
}

impl BundleValidator for FhirBundleValidator {
    fn variant(&self) -> SchemaVariant {
        self.variant
    }

    fn validate(&self, content: &str) -> Result<Vec<ValidationIssue>, BundleError> {
        let value = Self::parse(content)?;
        let bundle = self.deserialize(&value)?;
        Ok(self.check_rules(bundle))
    }
}

fn compound_failure(problems: Vec<String>) -> BundleError {
    let framed: Vec<String> = problems.iter().map(|p| format!("({})", p)).collect();
    BundleError::Deserialization {
        message: format!(
            "While deserializing a Bundle, found {} problem{}: {}",
            problems.len(),
            if problems.len() == 1 { "" } else { "s" },
            framed.join(" ")
        ),
    }
}

fn expect_kind(
    problems: &mut Vec<String>,
    path: &str,
    element: &Value,
    expected: &str,
    matches: fn(&Value) -> bool,
) {
    if !matches(element) {
        problems.push(format!(
            "Element '{}' must be {}, found {}",
            path,
            expected,
            kind_of(element)
        ));
    }
}

fn check_entry_shape(problems: &mut Vec<String>, index: usize, entry: &Value) {
    let path = format!("Bundle.entry[{}]", index);
    let Some(entry) = entry.as_object() else {
        problems.push(format!(
            "Element '{}' must be an object, found {}",
            path,
            kind_of(entry)
        ));
        return;
    };

    for (name, element) in entry {
        let base = name.strip_prefix('_').unwrap_or(name);
        if !ENTRY_ELEMENTS.contains(&base) {
            problems.push(format!(
                "Encountered unknown element '{}' at location '{}.{}'",
                name, path, name
            ));
            continue;
        }
        if name.starts_with('_') {
            continue;
        }

        let element_path = format!("{}.{}", path, name);
        match name.as_str() {
            "fullUrl" | "id" => {
                expect_kind(problems, &element_path, element, "a string", Value::is_string)
            }
            "search" | "request" | "response" => {
                expect_kind(problems, &element_path, element, "an object", Value::is_object)
            }
            "link" | "extension" | "modifierExtension" => {
                expect_kind(problems, &element_path, element, "an array", Value::is_array)
            }
            "resource" => match element.as_object() {
                Some(resource) => match resource.get("resourceType") {
                    Some(Value::String(_)) => {}
                    Some(other) => problems.push(format!(
                        "Element '{}.resourceType' must be a string, found {}",
                        element_path,
                        kind_of(other)
                    )),
                    None => problems.push(format!(
                        "Element '{}' is missing the 'resourceType' element",
                        element_path
                    )),
                },
                None => problems.push(format!(
                    "Element '{}' must be an object, found {}",
                    element_path,
                    kind_of(element)
                )),
            },
            _ => {}
        }
    }
}

fn has_identifier_with_system_and_value(bundle: &Map<String, Value>) -> bool {
    bundle
        .get("identifier")
        .and_then(Value::as_object)
        .is_some_and(|identifier| {
            identifier.get("system").is_some_and(Value::is_string)
                && identifier.get("value").is_some_and(Value::is_string)
        })
}

fn first_resource_type(entries: &[Value]) -> Option<&str> {
    entries
        .first()?
        .get("resource")?
        .get("resourceType")?
        .as_str()
}

/// The bundle's logical `id`, if the document parses and carries one
pub fn bundle_id(content: &str) -> Option<String> {
    serde_json::from_str::<Value>(content)
        .ok()?
        .get("id")?
        .as_str()
        .map(str::to_string)
}
