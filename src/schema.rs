//! Node schema validation.
//!
//! The store and the engine only need `validate(document) -> bool`; the
//! [`NodeValidator`] trait is that seam. [`SchemaValidator`] backs it with a JSON
//! Schema, by default the bundled node schema.

use jsonschema::JSONSchema;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ValidationError;

/// Bundled JSON Schema for node files.
pub const NODE_SCHEMA: &str = include_str!("../schemas/scm_node.schema.json");

/// Decides whether a raw node document may be loaded.
pub trait NodeValidator {
  fn validate(&self, document: &Value) -> bool;
}

impl<F> NodeValidator for F
where
  F: Fn(&Value) -> bool,
{
  fn validate(&self, document: &Value) -> bool {
    self(document)
  }
}

/// JSON Schema backed validator.
pub struct SchemaValidator {
  compiled: JSONSchema,
}

impl SchemaValidator {
  /// Validator for the bundled node schema.
  pub fn node_schema() -> Result<Self, ValidationError> {
    let schema: Value =
      serde_json::from_str(NODE_SCHEMA).map_err(|e| ValidationError::InvalidSchema(e.to_string()))?;
    Self::from_value(&schema)
  }

  /// Compiles an arbitrary schema document.
  pub fn from_value(schema: &Value) -> Result<Self, ValidationError> {
    let compiled =
      JSONSchema::compile(schema).map_err(|e| ValidationError::InvalidSchema(e.to_string()))?;
    Ok(Self { compiled })
  }

  /// Validates and returns every violation as `path: message`.
  pub fn check(&self, document: &Value) -> Result<(), ValidationError> {
    self.compiled.validate(document).map_err(|errors| {
      ValidationError::Rejected(
        errors
          .map(|e| format!("{}: {}", e.instance_path, e))
          .collect(),
      )
    })
  }
}

impl NodeValidator for SchemaValidator {
  fn validate(&self, document: &Value) -> bool {
    match self.check(document) {
      Ok(()) => {
        debug!("node document passed schema validation");
        true
      }
      Err(e) => {
        warn!(error = %e, "node document failed schema validation");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{NodeValidator, SchemaValidator};
  use crate::error::ValidationError;
  use serde_json::json;

  #[test]
  fn bundled_schema_accepts_minimal_node() {
    let v = SchemaValidator::node_schema().unwrap();
    assert!(v.validate(&json!({
      "@id": "a_v1.0.0",
      "version": "1.0.0",
      "execution_logic": {"type": "Subgraph_Ref"}
    })));
  }

  #[test]
  fn bundled_schema_rejects_missing_id() {
    let v = SchemaValidator::node_schema().unwrap();
    let doc = json!({"version": "1.0.0", "execution_logic": {"type": "Model_Ref"}});
    assert!(!v.validate(&doc));
    match v.check(&doc) {
      Err(ValidationError::Rejected(msgs)) => assert!(msgs.iter().any(|m| m.contains("@id"))),
      other => panic!("expected rejection, got {:?}", other),
    }
  }

  #[test]
  fn bundled_schema_rejects_bad_connection_type() {
    let v = SchemaValidator::node_schema().unwrap();
    assert!(!v.validate(&json!({
      "@id": "b_v1.0.0",
      "version": "1.0.0",
      "execution_logic": {"type": "Model_Ref"},
      "depends_on": [{"node_ref": "a_v1.0.0", "connection_type": "Telepathy"}]
    })));
  }

  #[test]
  fn closures_are_validators() {
    let reject_all = |_: &serde_json::Value| false;
    assert!(!reject_all.validate(&json!({})));
  }
}
