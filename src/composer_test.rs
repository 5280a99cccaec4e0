//! Tests for composition and plain graph execution.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::composer::{GraphComposer, compose, resolve_inputs};
use crate::error::{ComposeError, ExecutionError};
use crate::test_support::{
  accept_all, event_types_for, node, node_value, quiet_session, trace_events, write_json,
  write_nodes,
};
use crate::tracer::{load_summary, summary_file_name};
use crate::types::{Node, NodeResult, RunStatus, ValueMap};

fn outputs(pairs: &[(&str, Value)]) -> NodeResult {
  let map: ValueMap = pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
  NodeResult::Outputs(map)
}

fn with_input(mut value: Value, name: &str, source: Option<&str>) -> Value {
  let mut input = json!({"input_name": name, "data_type_ref": "scalar_float"});
  if let Some(s) = source {
    input["source"] = json!(s);
  }
  value["inputs"].as_array_mut().unwrap().push(input);
  value
}

#[test]
fn sourced_input_is_taken_from_named_node() {
  let n: Node =
    serde_json::from_value(with_input(node_value("b", &["a"]), "value", Some("a"))).unwrap();
  let mut results = BTreeMap::new();
  results.insert("a".to_string(), outputs(&[("value", json!(4.5)), ("other", json!(1))]));

  let inputs = resolve_inputs(&n, &results).unwrap().unwrap();
  assert_eq!(inputs.len(), 1);
  assert_eq!(inputs["value"], json!(4.5));
}

#[test]
fn sourced_input_missing_from_source_is_an_error() {
  let n: Node =
    serde_json::from_value(with_input(node_value("b", &["a"]), "value", Some("a"))).unwrap();
  let mut results = BTreeMap::new();
  results.insert("a".to_string(), outputs(&[("other", json!(1))]));

  let err = resolve_inputs(&n, &results).unwrap_err();
  assert!(matches!(
    err,
    ExecutionError::MissingInput { ref input, ref source_node, .. } if input == "value" && source_node == "a"
  ));
  assert!(resolve_inputs(&n, &BTreeMap::new()).is_err());
}

#[test]
fn external_parameters_and_unresolved_inputs_leave_nothing() {
  let v = with_input(node_value("b", &["a"]), "threshold", Some("external_parameter"));
  let v = with_input(v, "unseen", None);
  let n: Node = serde_json::from_value(v).unwrap();
  assert_eq!(resolve_inputs(&n, &BTreeMap::new()).unwrap(), None);
}

#[test]
fn unsourced_input_found_in_dataflow_dependency() {
  let n: Node =
    serde_json::from_value(with_input(node_value("c", &["a", "b"]), "value", None)).unwrap();
  let mut results = BTreeMap::new();
  results.insert("b".to_string(), outputs(&[("value", json!(2.0))]));
  let inputs = resolve_inputs(&n, &results).unwrap().unwrap();
  assert_eq!(inputs["value"], json!(2.0));
}

#[test]
fn node_without_inputs_resolves_to_none() {
  assert_eq!(resolve_inputs(&node("a", &[]), &BTreeMap::new()).unwrap(), None);
}

#[test]
fn compose_reports_each_stage_failure() {
  let dir = tempfile::tempdir().unwrap();
  write_nodes(dir.path(), &[node_value("a", &["ghost"])]);
  assert!(matches!(
    compose(dir.path(), &accept_all),
    Err(ComposeError::Dependency(_))
  ));

  let dir = tempfile::tempdir().unwrap();
  write_nodes(dir.path(), &[node_value("a", &["b"]), node_value("b", &["a"])]);
  assert!(matches!(compose(dir.path(), &accept_all), Err(ComposeError::Cycle(_))));

  let dir = tempfile::tempdir().unwrap();
  assert!(matches!(compose(dir.path(), &accept_all), Err(ComposeError::Store(_))));
}

#[test]
fn chain_runs_in_order_and_returns_terminal_results() {
  let dir = tempfile::tempdir().unwrap();
  let nodes_dir = dir.path().join("nodes");
  std::fs::create_dir(&nodes_dir).unwrap();
  write_nodes(
    &nodes_dir,
    &[
      node_value("a", &[]),
      with_input(node_value("b", &["a"]), "value", Some("a")),
      node_value("c", &["b"]),
    ],
  );
  let traces = dir.path().join("traces");
  let mut session = quiet_session(&traces);

  let composition = compose(&nodes_dir, session.validator()).unwrap();
  assert_eq!(composition.plan, vec!["a", "b", "c"]);
  let outcome = GraphComposer::new(composition).execute(&mut session);

  assert_eq!(outcome.status, RunStatus::Success);
  assert_eq!(outcome.results.len(), 3);
  assert_eq!(outcome.metadata.len(), 3);
  let finals: Vec<&str> = outcome.final_results.iter().map(|(id, _)| id.as_str()).collect();
  assert_eq!(finals, vec!["c"]);

  let events = trace_events(&traces);
  assert_eq!(events.first().unwrap().event_type, "GRAPH_START");
  assert_eq!(events.last().unwrap().event_type, "GRAPH_END");
  let b = event_types_for(&events, "b");
  assert_eq!(b.first(), Some(&"COMPOSER_STEP_START"));
  assert_eq!(b.last(), Some(&"COMPOSER_STEP_END"));
  let inputs = events
    .iter()
    .find(|e| e.event_type == "NODE_INPUTS" && e.node_id.as_deref() == Some("b"))
    .unwrap();
  assert_eq!(inputs.data["source"], "composer");

  let summary = load_summary(&traces.join(summary_file_name("test"))).unwrap();
  assert_eq!(summary.status, "SUCCESS");
  assert_eq!(summary.nodes_executed, vec!["a", "b", "c"]);
}

#[test]
fn failing_node_stops_the_run() {
  let dir = tempfile::tempdir().unwrap();
  let nodes_dir = dir.path().join("nodes");
  std::fs::create_dir(&nodes_dir).unwrap();
  let mut bad = node_value("b", &["a"]);
  bad["execution_logic"]["type"] = json!("Quantum_Call");
  write_nodes(&nodes_dir, &[node_value("a", &[]), bad, node_value("c", &["b"])]);
  let traces = dir.path().join("traces");
  let mut session = quiet_session(&traces);

  let composition = compose(&nodes_dir, &accept_all).unwrap();
  let outcome = GraphComposer::new(composition).execute(&mut session);

  assert_eq!(outcome.status, RunStatus::Failed);
  assert!(outcome.results["b"].is_error());
  assert!(!outcome.results.contains_key("c"));
  assert!(outcome.final_results.is_empty());
  let events = trace_events(&traces);
  let end = events
    .iter()
    .rfind(|e| e.event_type == "COMPOSER_STEP_END")
    .unwrap();
  assert_eq!(end.node_id.as_deref(), Some("b"));
  assert_eq!(end.data["status"], "FAILED");
}

#[test]
fn missing_sourced_input_fails_before_loading() {
  let dir = tempfile::tempdir().unwrap();
  let nodes_dir = dir.path().join("nodes");
  std::fs::create_dir(&nodes_dir).unwrap();
  write_nodes(
    &nodes_dir,
    &[
      node_value("a", &[]),
      with_input(node_value("b", &["a"]), "absent", Some("a")),
    ],
  );
  let traces = dir.path().join("traces");
  let mut session = quiet_session(&traces);

  let outcome = GraphComposer::new(compose(&nodes_dir, &accept_all).unwrap()).execute(&mut session);

  assert_eq!(outcome.status, RunStatus::Failed);
  assert!(outcome.results["b"].is_error());
  let events = trace_events(&traces);
  assert_eq!(
    event_types_for(&events, "b"),
    vec!["COMPOSER_STEP_START", "NODE_ERROR"]
  );
}

#[test]
fn node_rejected_at_load_time_ends_step_as_load_failed() {
  let dir = tempfile::tempdir().unwrap();
  let nodes_dir = dir.path().join("nodes");
  std::fs::create_dir(&nodes_dir).unwrap();
  write_nodes(&nodes_dir, &[node_value("a", &[])]);
  let traces = dir.path().join("traces");
  let composition = compose(&nodes_dir, &accept_all).unwrap();
  // Stored nodes were accepted; the session validator now rejects them.
  let mut session = quiet_session(&traces).with_validator(|_: &Value| false);

  let outcome = GraphComposer::new(composition).execute(&mut session);

  assert_eq!(outcome.status, RunStatus::Failed);
  assert_eq!(
    outcome.results["a"],
    NodeResult::error("Load/Validation failed")
  );
  let events = trace_events(&traces);
  let end = events
    .iter()
    .find(|e| e.event_type == "COMPOSER_STEP_END")
    .unwrap();
  assert_eq!(end.data["status"], "LOAD_FAILED");
}

#[test]
fn nodes_dir_written_by_hand_runs_with_bundled_schema() {
  let dir = tempfile::tempdir().unwrap();
  let nodes_dir = dir.path().join("nodes");
  std::fs::create_dir(&nodes_dir).unwrap();
  write_json(&nodes_dir, "only.json", &node_value("only", &[]));
  let mut session = quiet_session(&dir.path().join("traces"));
  let composition = compose(&nodes_dir, session.validator()).unwrap();
  let outcome = GraphComposer::new(composition).execute(&mut session);
  assert!(outcome.is_success());
  assert_eq!(outcome.final_results[0].0, "only");
}
