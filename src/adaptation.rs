//! Versioned self-adaptation of nodes.
//!
//! When a node's adaptation strategy fires, [`AdaptationManager::perform`]
//! clones the node, applies the strategy's method to the clone, bumps its minor
//! version, and writes it as a new file next to the original with
//! `derived_from` pointing back. Every adaptation appends one line to the
//! adaptation log. The original node file is never touched.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde_json::{Number, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::error::AdaptationError;
use crate::node_io::{append_json_line, node_file_path, read_json_lines, save_new_node};
use crate::simulation::round_to;
use crate::triggers::{StandardTriggers, TriggerFiring, TriggerPolicy};
use crate::types::{
  AdaptationLogEntry, AdaptationMethod, AdaptationStrategy, ExecutionMetadata, LogicType, Node,
};
use crate::version::{bump_minor, split_version_suffix, with_version_suffix};

/// Author recorded on adapted nodes unless overridden.
pub const DEFAULT_AGENT_REF: &str = "agent_adaptor_v1";
/// File name of the adaptation log inside the trace directory.
pub const ADAPTATION_LOG_FILE: &str = "adaptation_log.jsonl";

/// A strategy whose trigger fired, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredStrategy {
  pub strategy: AdaptationStrategy,
  pub firing: TriggerFiring,
}

pub struct AdaptationManager {
  nodes_dir: PathBuf,
  log_path: PathBuf,
  agent_ref: String,
  triggers: Box<dyn TriggerPolicy>,
  rng: Box<dyn RngCore>,
}

impl AdaptationManager {
  /// Writes adapted nodes into `nodes_dir` and log lines to `log_path`.
  pub fn new(nodes_dir: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
    Self {
      nodes_dir: nodes_dir.into(),
      log_path: log_path.into(),
      agent_ref: DEFAULT_AGENT_REF.to_string(),
      triggers: Box::new(StandardTriggers::default()),
      rng: Box::new(StdRng::from_entropy()),
    }
  }

  pub fn with_agent_ref(mut self, agent_ref: impl Into<String>) -> Self {
    self.agent_ref = agent_ref.into();
    self
  }

  pub fn with_triggers(mut self, triggers: impl TriggerPolicy + 'static) -> Self {
    self.triggers = Box::new(triggers);
    self
  }

  /// Random source for parameter adjustment.
  pub fn with_rng(mut self, rng: impl RngCore + 'static) -> Self {
    self.rng = Box::new(rng);
    self
  }

  pub fn nodes_dir(&self) -> &Path {
    &self.nodes_dir
  }

  pub fn log_path(&self) -> &Path {
    &self.log_path
  }

  pub fn agent_ref(&self) -> &str {
    &self.agent_ref
  }

  /// The node's strategy, if it declares one and its trigger fires.
  pub fn check_trigger(
    &mut self,
    node: &Node,
    metadata: &ExecutionMetadata,
  ) -> Option<TriggeredStrategy> {
    let strategy = node.adaptation_strategy.as_ref()?;
    let firing = self.triggers.evaluate(strategy, metadata)?;
    info!(node_id = %node.id, condition = %firing.condition, "adaptation triggered");
    Some(TriggeredStrategy {
      strategy: strategy.clone(),
      firing,
    })
  }

  /// Writes the adapted version of `node` and logs it. Returns the new id.
  #[instrument(level = "trace", skip(self, node, triggered), fields(node_id = %node.id))]
  pub fn perform(
    &mut self,
    node: &Node,
    triggered: &TriggeredStrategy,
  ) -> Result<String, AdaptationError> {
    let method = &triggered.strategy.method;
    info!(node_id = %node.id, method = method.as_str(), "performing adaptation");

    let mut adapted = node.clone();
    let note = self.apply_method(method, &mut adapted);

    let new_version = bump_minor(&node.version);
    let new_id = with_version_suffix(&node.id, &new_version);
    let timestamp = chrono::Utc::now().to_rfc3339();
    let rationale = format!(
      "Adapted due to '{}'. Method: '{}'. Details: {}.{}",
      triggered.firing.condition,
      method.as_str(),
      triggered.firing.details,
      note
    );
    adapted.id = new_id.clone();
    adapted.version = new_version.clone();
    adapted.rationale = rationale.clone();
    adapted.creation_timestamp = timestamp.clone();
    adapted.author_ref = self.agent_ref.clone();
    adapted.derived_from = Some(node.id.clone());

    let path = node_file_path(&self.nodes_dir, &new_id);
    save_new_node(&path, &adapted)?;
    info!(file = %path.display(), "saved adapted node");

    let entry = AdaptationLogEntry {
      original_node_id: node.id.clone(),
      original_version: node.version.clone(),
      new_node_id: new_id.clone(),
      new_version,
      adaptation_trigger: triggered.firing.condition.clone(),
      trigger_details: triggered.firing.details.clone(),
      adaptation_method: method.as_str().to_string(),
      method_params: triggered.strategy.method_params.clone(),
      rationale,
      adapting_agent: self.agent_ref.clone(),
      adaptation_timestamp: timestamp,
      log_timestamp: chrono::Utc::now().to_rfc3339(),
    };
    if let Err(source) = append_json_line(&self.log_path, &entry) {
      if let Err(e) = std::fs::remove_file(&path) {
        warn!(error = %e, file = %path.display(), "cannot remove adapted node after log failure");
      }
      return Err(AdaptationError::Persist {
        path: self.log_path.clone(),
        source,
      });
    }
    info!(original = %node.id, adapted = %new_id, "adaptation logged");
    Ok(new_id)
  }

  /// Checks the trigger and adapts when it fires. Failures are logged and
  /// reported as `None`.
  pub fn evaluate_and_adapt(&mut self, node: &Node, metadata: &ExecutionMetadata) -> Option<String> {
    let Some(triggered) = self.check_trigger(node, metadata) else {
      debug!(node_id = %node.id, "no adaptation trigger met");
      return None;
    };
    match self.perform(node, &triggered) {
      Ok(new_id) => Some(new_id),
      Err(e) if e.is_already_adapted() => {
        warn!(node_id = %node.id, error = %e, "node already adapted, existing file kept");
        None
      }
      Err(e) => {
        error!(node_id = %node.id, error = %e, "adaptation failed");
        None
      }
    }
  }

  /// Transforms `adapted` per `method`; returns the rationale annotation.
  fn apply_method(&mut self, method: &AdaptationMethod, adapted: &mut Node) -> String {
    match method {
      AdaptationMethod::RetrainModel => retrain_model(adapted),
      AdaptationMethod::AdjustParameters => adjust_parameters(adapted, self.rng.as_mut()),
      AdaptationMethod::SelectNewAlgorithm => {
        " (Simulation: Would select a new algorithm/model reference).".to_string()
      }
      AdaptationMethod::TriggerHumanReview => {
        " Action required: Trigger human review process.".to_string()
      }
      AdaptationMethod::EvolveStructure => {
        " (Simulation: Would trigger graph structure evolution).".to_string()
      }
      AdaptationMethod::Other(name) => {
        warn!(method = %name, "unsupported adaptation method");
        " Unsupported adaptation method.".to_string()
      }
    }
  }
}

impl std::fmt::Debug for AdaptationManager {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AdaptationManager")
      .field("nodes_dir", &self.nodes_dir)
      .field("log_path", &self.log_path)
      .field("agent_ref", &self.agent_ref)
      .finish_non_exhaustive()
  }
}

/// Bumps the minor version embedded in a model reference.
fn retrain_model(adapted: &mut Node) -> String {
  let logic = &mut adapted.execution_logic;
  if logic.kind != LogicType::ModelRef || logic.reference.is_empty() {
    return " No model reference found to update.".to_string();
  }
  let Some((prefix, version)) = split_version_suffix(&logic.reference) else {
    return " Could not parse model reference for version bump.".to_string();
  };
  let next = bump_minor(version);
  logic.reference = format!("{}_v{}", prefix, next);
  format!(" Updated model reference to _v{}.", next)
}

/// Nudges one randomly chosen numeric parameter by up to 10% plus or minus one.
/// Floats are rounded to 3 places; integers stay integers.
fn adjust_parameters(adapted: &mut Node, rng: &mut dyn RngCore) -> String {
  let params = &mut adapted.execution_logic.parameters;
  if params.is_empty() {
    return " No parameters found to adjust.".to_string();
  }
  let idx = rng.gen_range(0..params.len());
  let Some((key, current)) = params.iter_mut().nth(idx) else {
    return " No parameters found to adjust.".to_string();
  };
  let old = current.clone();
  let Some(value) = current.as_f64() else {
    return format!(
      " Could not simulate adjustment for parameter '{}' (type: {}).",
      key,
      type_name(current)
    );
  };
  let nudge = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
  let adjusted = value + rng.gen_range(-0.1f64..=0.1) * value + nudge;
  *current = if current.is_f64() {
    Number::from_f64(round_to(adjusted, 3))
      .map(Value::Number)
      .unwrap_or(Value::Null)
  } else {
    Value::from(adjusted.trunc() as i64)
  };
  format!(" Adjusted parameter '{}' from {} to {}.", key, old, current)
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "str",
    Value::Array(_) => "list",
    Value::Object(_) => "dict",
  }
}

/// Reads every entry of an adaptation log.
pub fn load_adaptation_log(path: &Path) -> std::io::Result<Vec<AdaptationLogEntry>> {
  read_json_lines(path)
}
