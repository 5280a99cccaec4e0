//! What a run hands back to its caller.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::{ExecutionMetadata, NodeResult, RunStatus};

/// Final status, terminal-node results and everything captured per node.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
  pub status: RunStatus,
  /// Results of terminal nodes in plan order. Nodes that never ran are absent.
  pub final_results: Vec<(String, NodeResult)>,
  pub results: BTreeMap<String, NodeResult>,
  pub metadata: BTreeMap<String, ExecutionMetadata>,
  /// `(original id, new id)` for every adaptation performed during the run.
  pub adaptations: Vec<(String, String)>,
  /// `[DECISION]` / `[OBSERVATION]` lines when run under agent control.
  pub agent_log: Vec<String>,
}

impl RunOutcome {
  pub fn new(status: RunStatus) -> Self {
    Self {
      status,
      final_results: vec![],
      results: BTreeMap::new(),
      metadata: BTreeMap::new(),
      adaptations: vec![],
      agent_log: vec![],
    }
  }

  pub fn is_success(&self) -> bool {
    self.status == RunStatus::Success
  }

  /// Terminal results as a JSON object keyed by node id.
  pub fn final_results_json(&self) -> Value {
    let map = self
      .final_results
      .iter()
      .map(|(id, r)| (id.clone(), serde_json::to_value(r).unwrap_or(Value::Null)))
      .collect::<serde_json::Map<_, _>>();
    Value::Object(map)
  }
}
