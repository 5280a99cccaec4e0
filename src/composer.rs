//! Load, build and plan a node directory, and run the plan without agent
//! oversight.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::dag::{DependencyGraph, ExecutionPlan};
use crate::engine::ExecutionEngine;
use crate::error::{ComposeError, ExecutionError};
use crate::schema::NodeValidator;
use crate::session::Session;
use crate::store::NodeStore;
use crate::types::{ConnectionType, Node, NodeResult, RunOutcome, RunStatus, ValueMap};

/// `source` value marking an input supplied from outside the graph.
pub const EXTERNAL_PARAMETER: &str = "external_parameter";

/// A loaded store with its dependency graph and execution plan.
#[derive(Debug, Clone)]
pub struct Composition {
  pub store: NodeStore,
  pub graph: DependencyGraph,
  pub plan: ExecutionPlan,
}

impl Composition {
  /// Graph description logged with `GRAPH_START`.
  pub fn graph_info(&self) -> serde_json::Value {
    json!({"plan_length": self.plan.len(), "plan": self.plan})
  }

  /// First planned node that declares trace propagation.
  pub fn trace_propagation_node(&self) -> Option<&str> {
    self
      .plan
      .iter()
      .find(|id| {
        self
          .store
          .get(id)
          .is_some_and(|n| n.observability.trace_propagation)
      })
      .map(String::as_str)
  }

  /// Results of terminal nodes that ran, in plan order.
  pub fn final_results(&self, results: &BTreeMap<String, NodeResult>) -> Vec<(String, NodeResult)> {
    terminal_results(&self.graph, &self.plan, results)
  }
}

pub(crate) fn terminal_results(
  graph: &DependencyGraph,
  plan: &[String],
  results: &BTreeMap<String, NodeResult>,
) -> Vec<(String, NodeResult)> {
  graph
    .terminal_nodes(plan)
    .into_iter()
    .filter_map(|id| results.get(id).map(|r| (id.to_string(), r.clone())))
    .collect()
}

/// Loads `dir`, builds its dependency graph and plans it. Any failure aborts
/// before a node runs.
#[instrument(level = "trace", skip(validator))]
pub fn compose(dir: &Path, validator: &dyn NodeValidator) -> Result<Composition, ComposeError> {
  let store = NodeStore::load(dir, validator)?;
  let graph = DependencyGraph::build(&store)?;
  let plan = graph.plan()?;
  Ok(Composition { store, graph, plan })
}

/// Inputs of `node` taken from outputs of nodes that already ran.
///
/// An input whose `source` names a node must find an output of the same name
/// in that node's result. `external_parameter` inputs are left to mocks. Inputs
/// without `source` are looked up in DataFlow dependencies, in declaration
/// order. Returns `None` when nothing was resolved.
pub fn resolve_inputs(
  node: &Node,
  results: &BTreeMap<String, NodeResult>,
) -> Result<Option<ValueMap>, ExecutionError> {
  let outputs_of = |id: &str| results.get(id).and_then(NodeResult::outputs);
  let mut inputs = ValueMap::new();
  for input in node.inputs.iter().filter(|i| !i.name.is_empty()) {
    match input.source.as_deref() {
      Some(EXTERNAL_PARAMETER) => {}
      Some(source) => {
        let value = outputs_of(source).and_then(|o| o.get(&input.name));
        let Some(value) = value else {
          return Err(ExecutionError::MissingInput {
            node_id: node.id.clone(),
            input: input.name.clone(),
            source_node: source.to_string(),
          });
        };
        debug!(input = %input.name, from = %source, to = %node.id, "passing output");
        inputs.insert(input.name.clone(), value.clone());
      }
      None => {
        let found = node
          .depends_on
          .iter()
          .filter(|d| d.connection_type == ConnectionType::DataFlow)
          .find_map(|d| outputs_of(&d.node_ref).and_then(|o| o.get(&input.name)));
        if let Some(value) = found {
          inputs.insert(input.name.clone(), value.clone());
        }
      }
    }
  }
  Ok((!inputs.is_empty()).then_some(inputs))
}

/// Runs a composition node by node, stopping at the first failure.
#[derive(Debug)]
pub struct GraphComposer {
  composition: Composition,
}

impl GraphComposer {
  pub fn new(composition: Composition) -> Self {
    Self { composition }
  }

  pub fn composition(&self) -> &Composition {
    &self.composition
  }

  /// Executes the plan. Ends the trace session with SUCCESS or FAILED.
  #[instrument(level = "trace", skip(self, session))]
  pub fn execute(&self, session: &mut Session) -> RunOutcome {
    let c = &self.composition;
    info!(plan = ?c.plan, "starting graph execution");
    session.tracer.start_trace(c.graph_info());
    match c.trace_propagation_node() {
      Some(id) => info!(node_id = %id, "trace propagation enabled"),
      None => debug!("trace propagation not enabled by any planned node"),
    }

    let mut outcome = RunOutcome::new(RunStatus::Success);
    let total = c.plan.len();
    for (i, id) in c.plan.iter().enumerate() {
      info!(step = i + 1, total, node_id = %id, "executing node");
      session.log_event(
        "COMPOSER_STEP_START",
        json!({"step": i + 1, "total_steps": total}),
        Some(id),
      );
      if !self.step(id, &mut outcome, session) {
        outcome.status = RunStatus::Failed;
        break;
      }
    }

    outcome.final_results = c.final_results(&outcome.results);
    session
      .tracer
      .end_trace(&outcome.status.to_string(), outcome.final_results_json());
    match outcome.status {
      RunStatus::Success => info!("graph execution completed successfully"),
      _ => error!("graph execution failed"),
    }
    outcome
  }

  fn step(&self, id: &str, outcome: &mut RunOutcome, session: &mut Session) -> bool {
    let c = &self.composition;
    let (Some(node), Some(path)) = (c.store.get(id), c.store.path_of(id)) else {
      warn!(node_id = %id, "planned node missing from store");
      return false;
    };
    let inputs = match resolve_inputs(node, &outcome.results) {
      Ok(inputs) => inputs,
      Err(e) => {
        error!(node_id = %id, error = %e, "missing inputs");
        session.log_event(
          "NODE_ERROR",
          json!({"error": "Missing required inputs from dependencies", "detail": e.to_string()}),
          Some(id),
        );
        outcome.results.insert(id.to_string(), NodeResult::error(e.to_string()));
        return false;
      }
    };

    let mut engine = ExecutionEngine::new(path);
    if !engine.load_and_validate(session) {
      error!(node_id = %id, "loading or validation failed");
      outcome
        .results
        .insert(id.to_string(), NodeResult::error("Load/Validation failed"));
      session.log_event("COMPOSER_STEP_END", json!({"status": "LOAD_FAILED"}), Some(id));
      return false;
    }
    let ok = engine.execute(inputs, session);
    if let Some(result) = engine.result() {
      outcome.results.insert(id.to_string(), result.clone());
    }
    outcome.metadata.insert(id.to_string(), engine.metadata().clone());
    let status = if ok { "SUCCESS" } else { "FAILED" };
    session.log_event("COMPOSER_STEP_END", json!({"status": status}), Some(id));
    ok
  }
}
