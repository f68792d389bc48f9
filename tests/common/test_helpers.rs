#![allow(dead_code)]

use std::path::Path;
use tempfile::TempDir;
use tokio::fs;

use fhir_bundle_validator::object_store::S3Location;

pub const VALID_COLLECTION: &str = r#"{
  "resourceType": "Bundle",
  "id": "bundle-example",
  "type": "collection",
  "entry": [
    {
      "fullUrl": "urn:uuid:61ebe359-bfdc-4613-8bf2-c5e300945f0a",
      "resource": { "resourceType": "Patient", "id": "p1" }
    }
  ]
}"#;

/// Deserializes but violates the `type` cardinality
pub const MISSING_TYPE: &str = r#"{
  "resourceType": "Bundle",
  "entry": [ { "resource": { "resourceType": "Patient" } } ]
}"#;

/// Two shape problems in one document
pub const TWO_SHAPE_PROBLEMS: &str = r#"{
  "resourceType": "Bundle",
  "type": "collection",
  "total": "three",
  "bogus": 1
}"#;

/// Valid in R4 only, because `timestamp` does not exist in STU3
pub const R4_ONLY: &str = r#"{
  "resourceType": "Bundle",
  "type": "collection",
  "timestamp": "2024-05-01T10:00:00Z"
}"#;

pub const NOT_JSON: &str = "this is not json";

/// Temporary directory holding one file per `(name, content)` pair
pub async fn bundle_dir(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(temp_dir.path().join(name), content).await.unwrap();
    }
    temp_dir
}

/// Identifier a local source assigns to `name` inside `dir`
pub fn local_id(dir: &Path, name: &str) -> String {
    dir.join(name).display().to_string()
}

pub async fn read_json(path: &Path) -> serde_json::Value {
    let content = fs::read_to_string(path).await.unwrap();
    serde_json::from_str(&content).unwrap()
}

pub fn location(bucket: &str, prefix: &str) -> S3Location {
    S3Location {
        bucket: bucket.to_string(),
        prefix: prefix.to_string(),
    }
}

/// Deeply nested array that exceeds the JSON parser's recursion limit
pub fn too_deep() -> String {
    format!("{}{}", "[".repeat(300), "]".repeat(300))
}
