//! Node builders and on-disk fixtures shared by unit tests.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};

use crate::session::Session;
use crate::simulation::SimulationProfile;
use crate::tracer::{Tracer, read_trace_events, trace_file_name};
use crate::types::{Node, TraceEvent};

/// Minimal valid node document depending on `deps` via DataFlow.
pub fn node_value(id: &str, deps: &[&str]) -> Value {
  json!({
    "@id": id,
    "version": "1.0.0",
    "purpose_statement": format!("test node {}", id),
    "execution_logic": {"type": "Subgraph_Ref", "reference": "", "parameters": {}},
    "inputs": [],
    "outputs": [{"output_name": "value", "data_type_ref": "scalar_float"}],
    "depends_on": deps
      .iter()
      .map(|d| json!({"node_ref": d, "connection_type": "DataFlow"}))
      .collect::<Vec<_>>(),
  })
}

pub fn node(id: &str, deps: &[&str]) -> Node {
  serde_json::from_value(node_value(id, deps)).unwrap()
}

/// Writes `value` to `<dir>/<file_name>` and returns the path.
pub fn write_json(dir: &Path, file_name: &str, value: &Value) -> PathBuf {
  let path = dir.join(file_name);
  std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
  path
}

/// Writes each node as `<id>.json`.
pub fn write_nodes(dir: &Path, values: &[Value]) {
  for v in values {
    let id = v["@id"].as_str().unwrap();
    write_json(dir, &format!("{}.json", id), v);
  }
}

/// Accepts every document.
pub fn accept_all(_: &Value) -> bool {
  true
}

/// Session tracing into `trace_dir` as session `test`, with no simulated
/// latency and a seeded random source.
pub fn quiet_session(trace_dir: &Path) -> Session {
  Session::new(Tracer::with_session_id(trace_dir, "test").unwrap())
    .unwrap()
    .with_simulation(SimulationProfile::instant())
    .with_rng(StdRng::seed_from_u64(42))
}

/// Events of the `test` session in `trace_dir`.
pub fn trace_events(trace_dir: &Path) -> Vec<TraceEvent> {
  read_trace_events(&trace_dir.join(trace_file_name("test"))).unwrap_or_default()
}

/// Event types of `events` concerning `node_id`, in order.
pub fn event_types_for<'a>(events: &'a [TraceEvent], node_id: &str) -> Vec<&'a str> {
  events
    .iter()
    .filter(|e| e.node_id.as_deref() == Some(node_id))
    .map(|e| e.event_type.as_str())
    .collect()
}
