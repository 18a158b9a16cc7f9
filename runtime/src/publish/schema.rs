//! Post-publish schema gate: validate `dist/manifest.json` against the
//! JSON Schema (2020-12) in `SPECS/manifest.schema.json`.
//!
//! Runs after the atomic swap, so a failing manifest is already in place
//! when it is reported. The gate only decides the exit status.

use crate::artifacts;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// One schema violation.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    /// JSON pointer into the manifest.
    pub instance_path: String,
    /// JSON pointer into the schema.
    pub schema_path: String,
    pub message: String,
}

/// Result of validating one document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaReport {
    pub violations: Vec<Violation>,
}

impl SchemaReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A compiled manifest schema.
pub struct SchemaGate {
    validator: jsonschema::Validator,
}

impl SchemaGate {
    /// Compile a 2020-12 schema document.
    pub fn new(schema: &Value) -> Result<Self> {
        let validator = jsonschema::draft202012::new(schema)
            .map_err(|e| anyhow!("invalid schema: {e}"))?;
        Ok(Self { validator })
    }

    /// Load and compile a schema file. A missing file is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("schema not found: {}", path.display());
        }
        let schema: Value = artifacts::read_json(path)?;
        Self::new(&schema).with_context(|| format!("failed to compile {}", path.display()))
    }

    /// Every violation in `instance`.
    pub fn check(&self, instance: &Value) -> SchemaReport {
        let violations = self
            .validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();
        SchemaReport { violations }
    }

    /// Validate a JSON file on disk.
    pub fn check_file(&self, path: &Path) -> Result<SchemaReport> {
        let instance: Value = artifacts::read_json(path)?;
        Ok(self.check(&instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gate() -> SchemaGate {
        SchemaGate::new(&json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "required": ["schema", "items"],
            "properties": {
                "schema": {"type": "string"},
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["pack_id"],
                        "properties": {"pack_id": {"type": "string", "minLength": 1}}
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_document() {
        let report = gate().check(&json!({"schema": "1.2", "items": [{"pack_id": "cafe"}]}));
        assert!(report.is_valid());
    }

    #[test]
    fn test_collects_all_violations() {
        let report = gate().check(&json!({"items": [{"pack_id": ""}, {}]}));
        assert!(!report.is_valid());
        assert!(report.violations.len() >= 3);
        assert!(report
            .violations
            .iter()
            .any(|v| v.instance_path == "/items/0/pack_id"));
    }

    #[test]
    fn test_missing_schema_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SchemaGate::from_file(&dir.path().join("manifest.schema.json")).is_err());
    }
}
