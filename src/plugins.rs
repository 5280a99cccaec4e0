//! Registry of model implementations addressed by `execution_logic.reference`.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::PluginError;
use crate::types::ValueMap;

/// A model implementation: `(inputs, params) -> outputs`.
///
/// Implementations return a JSON object whose keys include every declared
/// output of the calling node. Anything else is treated by the engine as a
/// contract violation and replaced by simulation.
pub trait ModelPlugin {
  fn run(&self, inputs: &ValueMap, params: &ValueMap) -> Result<Value, PluginError>;
}

impl<F> ModelPlugin for F
where
  F: Fn(&ValueMap, &ValueMap) -> Result<Value, PluginError>,
{
  fn run(&self, inputs: &ValueMap, params: &ValueMap) -> Result<Value, PluginError> {
    self(inputs, params)
  }
}

/// Plugins keyed by reference name.
#[derive(Default)]
pub struct PluginRegistry {
  plugins: HashMap<String, Box<dyn ModelPlugin>>,
}

impl PluginRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `plugin` under `reference`, replacing any previous one.
  pub fn register(&mut self, reference: impl Into<String>, plugin: impl ModelPlugin + 'static) {
    self.plugins.insert(reference.into(), Box::new(plugin));
  }

  pub fn resolve(&self, reference: &str) -> Result<&dyn ModelPlugin, PluginError> {
    self
      .plugins
      .get(reference)
      .map(|p| p.as_ref())
      .ok_or_else(|| PluginError::NotFound(reference.to_string()))
  }

  pub fn contains(&self, reference: &str) -> bool {
    self.plugins.contains_key(reference)
  }

  pub fn len(&self) -> usize {
    self.plugins.len()
  }

  pub fn is_empty(&self) -> bool {
    self.plugins.is_empty()
  }
}

impl std::fmt::Debug for PluginRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut refs: Vec<&String> = self.plugins.keys().collect();
    refs.sort();
    f.debug_struct("PluginRegistry").field("references", &refs).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::PluginRegistry;
  use crate::error::PluginError;
  use crate::types::ValueMap;
  use serde_json::{Value, json};

  fn echo(inputs: &ValueMap, _: &ValueMap) -> Result<Value, PluginError> {
    Ok(Value::Object(inputs.clone()))
  }

  #[test]
  fn resolves_registered_plugin() {
    let mut reg = PluginRegistry::new();
    reg.register("echo_v1.0.0", echo);
    let mut inputs = ValueMap::new();
    inputs.insert("x".to_string(), json!(3));
    let out = reg
      .resolve("echo_v1.0.0")
      .unwrap()
      .run(&inputs, &ValueMap::new())
      .unwrap();
    assert_eq!(out, json!({"x": 3}));
  }

  #[test]
  fn unknown_reference_is_not_found() {
    let reg = PluginRegistry::new();
    assert!(matches!(
      reg.resolve("missing"),
      Err(PluginError::NotFound(r)) if r == "missing"
    ));
  }

  #[test]
  fn closures_register_as_plugins() {
    let mut reg = PluginRegistry::new();
    let scale = 2.0;
    reg.register("scaled", move |_: &ValueMap, p: &ValueMap| -> Result<Value, PluginError> {
      let base = p.get("base").and_then(Value::as_f64).unwrap_or(1.0);
      Ok(json!({"y": base * scale}))
    });
    let mut params = ValueMap::new();
    params.insert("base".to_string(), json!(4.0));
    let out = reg.resolve("scaled").unwrap().run(&ValueMap::new(), &params).unwrap();
    assert_eq!(out["y"], json!(8.0));
    assert_eq!(reg.len(), 1);
  }
}
