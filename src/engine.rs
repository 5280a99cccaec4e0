//! Executes exactly one node.
//!
//! `Unloaded -> Loaded -> Executing -> {Succeeded | Failed}`. Loading reads the
//! node file and runs the session validator. Executing resolves inputs,
//! dispatches by execution type (plugin with simulation fallback, or pure
//! simulation), then records the result, timing and confidence.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde_json::{Value, json};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ExecutionError, PluginError};
use crate::node_io::{decode_node, read_node_value};
use crate::plugins::PluginRegistry;
use crate::session::Session;
use crate::simulation::{CONFIDENCE_KEY, placeholder_inputs};
use crate::tracer::{NODE_END, NODE_ERROR};
use crate::types::{
  ConfidenceSource, ExecutionMetadata, ExecutionMode, LogicType, Node, NodeResult, OutputSpec,
  ValueMap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
  Unloaded,
  Loaded,
  Executing,
  Succeeded,
  Failed,
}

/// Single-node executor. One instance per node per run.
#[derive(Debug)]
pub struct ExecutionEngine {
  path: PathBuf,
  node: Option<Node>,
  state: EngineState,
  result: Option<NodeResult>,
  metadata: ExecutionMetadata,
}

impl ExecutionEngine {
  pub fn new(node_path: impl Into<PathBuf>) -> Self {
    Self {
      path: node_path.into(),
      node: None,
      state: EngineState::Unloaded,
      result: None,
      metadata: ExecutionMetadata::default(),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn state(&self) -> EngineState {
    self.state
  }

  pub fn node(&self) -> Option<&Node> {
    self.node.as_ref()
  }

  pub fn result(&self) -> Option<&NodeResult> {
    self.result.as_ref()
  }

  pub fn metadata(&self) -> &ExecutionMetadata {
    &self.metadata
  }

  /// Reads, validates and decodes the node file. Any failure is terminal.
  #[instrument(level = "trace", skip(self, session), fields(path = %self.path.display()))]
  pub fn load_and_validate(&mut self, session: &mut Session) -> bool {
    if self.state != EngineState::Unloaded {
      warn!(state = ?self.state, "node already loaded or failed");
      return self.state == EngineState::Loaded;
    }
    info!(path = %self.path.display(), "loading node");
    let value = match read_node_value(&self.path) {
      Ok(v) => v,
      Err(e) => {
        error!(error = %e, "cannot load node");
        session.log_event("NODE_LOAD_FAILED", json!({"reason": e.to_string()}), None);
        return self.fail_load(e.to_string());
      }
    };
    let node_id = value
      .get("@id")
      .and_then(Value::as_str)
      .unwrap_or("unknown_node")
      .to_string();
    session.log_event(
      "NODE_LOAD_START",
      json!({"path": self.path.display().to_string()}),
      Some(&node_id),
    );
    if !session.validator().validate(&value) {
      error!(node_id = %node_id, "node validation failed, cannot execute");
      session.log_event("NODE_LOAD_FAILED", json!({"reason": "Validation failed"}), Some(&node_id));
      return self.fail_load("Validation failed".to_string());
    }
    match decode_node(&self.path, value) {
      Ok(node) => {
        session.log_event("NODE_LOAD_SUCCESS", json!({"node_id": node.id}), Some(&node.id));
        info!(node_id = %node.id, log_level = %node.observability.logs.level, "node loaded");
        self.node = Some(node);
        self.state = EngineState::Loaded;
        true
      }
      Err(e) => {
        error!(error = %e, "cannot decode node");
        session.log_event("NODE_LOAD_FAILED", json!({"reason": e.to_string()}), Some(&node_id));
        self.fail_load(e.to_string())
      }
    }
  }

  fn fail_load(&mut self, reason: String) -> bool {
    self.result = Some(NodeResult::error(reason));
    self.state = EngineState::Failed;
    false
  }

  /// Runs the loaded node. `inputs` (when given) are filtered to the declared
  /// input names; otherwise mock inputs are generated. Returns true when a
  /// result mapping was produced.
  #[instrument(level = "trace", skip(self, inputs, session), fields(path = %self.path.display()))]
  pub fn execute(&mut self, inputs: Option<ValueMap>, session: &mut Session) -> bool {
    if self.state != EngineState::Loaded {
      error!(state = ?self.state, "{}", ExecutionError::NotLoaded);
      return false;
    }
    let Some(node) = self.node.take() else {
      return false;
    };
    self.state = EngineState::Executing;
    info!(node_id = %node.id, "starting execution");
    session.log_event("NODE_EXEC_START", json!({}), Some(&node.id));
    let started = Instant::now();

    let inputs = resolve_engine_inputs(&node, inputs, session);
    let outcome = self.dispatch(&node, &inputs, session);
    self.metadata.execution_duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    let ok = match outcome {
      Ok(outputs) => {
        self.record_success(&node, outputs, session);
        true
      }
      Err(e) => {
        let message = e.to_string();
        error!(node_id = %node.id, error = %message, "node execution failed");
        session.log_event(NODE_ERROR, json!({"error": message}), Some(&node.id));
        session.log_event(NODE_END, json!({"status": "FAILED", "error": message}), Some(&node.id));
        self.result = Some(NodeResult::error(message));
        self.state = EngineState::Failed;
        false
      }
    };
    self.node = Some(node);
    ok
  }

  fn dispatch(
    &mut self,
    node: &Node,
    inputs: &ValueMap,
    session: &mut Session,
  ) -> Result<ValueMap, ExecutionError> {
    let logic = &node.execution_logic;
    let outputs = match &logic.kind {
      LogicType::ModelRef => {
        self.metadata.execution_mode = Some(ExecutionMode::RealModelAttempt);
        match call_plugin(&session.plugins, node, inputs) {
          Ok(outputs) => {
            info!(node_id = %node.id, reference = %logic.reference, "model output validated");
            self.metadata.execution_mode = Some(ExecutionMode::RealModelSuccess);
            outputs
          }
          Err(e) => {
            warn!(node_id = %node.id, reference = %logic.reference, error = %e, "model call failed, falling back to simulation");
            let mut data = json!({"error": format!("Real model call failed: {}", e)});
            if let PluginError::MissingOutputs(keys) = &e {
              data["missing_keys"] = json!(keys);
            }
            session.log_event(NODE_ERROR, data, Some(&node.id));
            self.metadata.execution_mode = Some(ExecutionMode::SimulationFallback);
            let placeholders = placeholder_inputs(&node.inputs);
            session.log_event(
              "NODE_INPUTS",
              json!({"inputs": placeholders, "source": "simulation_fallback"}),
              Some(&node.id),
            );
            session.simulate("model", &logic.reference, &logic.parameters, &node.outputs)
          }
        }
      }
      LogicType::SubgraphRef => {
        self.metadata.execution_mode = Some(ExecutionMode::Simulation);
        session.simulate("subgraph", &logic.reference, &ValueMap::new(), &node.outputs)
      }
      LogicType::ExternalCall => {
        self.metadata.execution_mode = Some(ExecutionMode::Simulation);
        session.simulate("external call", &logic.reference, &logic.parameters, &node.outputs)
      }
      LogicType::Other(kind) => return Err(ExecutionError::UnsupportedType(kind.clone())),
    };
    if outputs.is_empty() {
      let mode = self
        .metadata
        .execution_mode
        .map(|m| m.to_string())
        .unwrap_or_else(|| "unknown".to_string());
      return Err(ExecutionError::EmptyResult { mode });
    }
    Ok(outputs)
  }

  fn record_success(&mut self, node: &Node, outputs: ValueMap, session: &mut Session) {
    match extract_confidence(&outputs, &node.outputs) {
      Some(c) => {
        let source = if self.metadata.execution_mode == Some(ExecutionMode::RealModelSuccess) {
          ConfidenceSource::Model
        } else {
          ConfidenceSource::Simulation
        };
        self.metadata.confidence_source = Some(source);
        self.metadata.simulated_confidence = Some(c);
      }
      None => self.metadata.confidence_source = Some(ConfidenceSource::None),
    }

    session.log_event("NODE_OUTPUTS", json!({"outputs": outputs}), Some(&node.id));
    info!(
      node_id = %node.id,
      mode = ?self.metadata.execution_mode,
      duration_ms = self.metadata.execution_duration_ms,
      "execution successful"
    );
    self.report_metrics(node, session);
    self.result = Some(NodeResult::Outputs(outputs));
    self.state = EngineState::Succeeded;
    session.log_event(
      NODE_END,
      json!({"status": "SUCCESS", "execution_mode": self.metadata.execution_mode}),
      Some(&node.id),
    );
  }

  fn report_metrics(&self, node: &Node, session: &mut Session) {
    let id = Some(node.id.as_str());
    let duration_ms = self.metadata.execution_duration_ms;
    session.log_event(
      "NODE_METRIC",
      json!({"metric_name": "execution_duration_ms", "value": duration_ms}),
      id,
    );
    let metrics = &node.observability.metrics;
    if let Some(confidence) = self.metadata.simulated_confidence {
      session.log_event(
        "NODE_METRIC",
        json!({"metric_name": "confidence", "value": confidence, "source": self.metadata.confidence_source}),
        id,
      );
      for m in metrics.iter().filter(|m| m.metric_ref.to_lowercase().contains("confidence")) {
        session.log_event("NODE_METRIC", json!({"metric_name": m.metric_ref, "value": confidence}), id);
      }
    }
    for m in metrics.iter().filter(|m| m.metric_ref.to_lowercase().contains("exec_time")) {
      session.log_event(
        "NODE_METRIC",
        json!({"metric_name": m.metric_ref, "value": duration_ms / 1000.0, "unit": "s"}),
        id,
      );
    }
    if node.observability.trace_propagation {
      session.log_event("TRACE_PROPAGATION_ENABLED", json!({}), id);
      debug!(node_id = %node.id, "trace propagation enabled");
    }
  }
}

/// Supplied inputs filtered to declared names, or mocks.
fn resolve_engine_inputs(node: &Node, supplied: Option<ValueMap>, session: &mut Session) -> ValueMap {
  let (inputs, source) = match supplied {
    Some(supplied) => {
      let declared = node.input_names();
      let filtered: ValueMap = supplied
        .into_iter()
        .filter(|(k, _)| declared.contains(&k.as_str()))
        .collect();
      if filtered.len() != declared.len() {
        warn!(
          node_id = %node.id,
          required = ?declared,
          provided = ?filtered.keys().collect::<Vec<_>>(),
          "supplied inputs do not match declared inputs"
        );
      }
      (filtered, "composer")
    }
    None => (session.mock_inputs(&node.inputs), "generated_mock"),
  };
  let structure: ValueMap = inputs
    .iter()
    .map(|(k, v)| (k.clone(), json!(json_type_name(v))))
    .collect();
  session.log_event(
    "NODE_INPUTS",
    json!({"inputs_structure": structure, "source": source}),
    Some(&node.id),
  );
  inputs
}

fn json_type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(n) if n.is_f64() => "float",
    Value::Number(_) => "int",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

/// Resolves and invokes the node's plugin, enforcing the output contract.
fn call_plugin(plugins: &PluginRegistry, node: &Node, inputs: &ValueMap) -> Result<ValueMap, PluginError> {
  let logic = &node.execution_logic;
  let plugin = plugins.resolve(&logic.reference)?;
  let Value::Object(outputs) = plugin.run(inputs, &logic.parameters)? else {
    return Err(PluginError::NotAMapping);
  };
  let missing: Vec<String> = node
    .outputs
    .iter()
    .filter(|o| !o.name.is_empty() && !outputs.contains_key(&o.name))
    .map(|o| o.name.clone())
    .collect();
  if !missing.is_empty() {
    return Err(PluginError::MissingOutputs(missing));
  }
  Ok(outputs)
}

/// First numeric confidence in `outputs`: the `confidence` key, then declared
/// outputs whose name mentions confidence, then any other such key.
pub fn extract_confidence(outputs: &ValueMap, declared: &[OutputSpec]) -> Option<f64> {
  let mentions = |name: &str| name.to_lowercase().contains(CONFIDENCE_KEY);
  outputs
    .get(CONFIDENCE_KEY)
    .and_then(Value::as_f64)
    .or_else(|| {
      declared
        .iter()
        .filter(|o| mentions(&o.name))
        .find_map(|o| outputs.get(&o.name).and_then(Value::as_f64))
    })
    .or_else(|| {
      outputs
        .iter()
        .filter(|(k, _)| mentions(k))
        .find_map(|(_, v)| v.as_f64())
    })
}
