//! Tests for the trace session handle.

use crate::tracer::{Tracer, load_summary, read_trace_events, summary_file_name, trace_file_name};
use serde_json::json;

#[test]
fn disabled_tracer_ignores_calls() {
  let mut t = Tracer::disabled();
  t.log_event("NODE_END", json!({"status": "SUCCESS"}), Some("a"));
  t.log_event("NODE_END", json!({"status": "SUCCESS"}), Some("b"));
  assert!(!t.is_active());
  assert!(t.end_trace("SUCCESS", json!({})).is_none());
}

#[test]
fn events_append_one_line_each_in_order() {
  let dir = tempfile::tempdir().unwrap();
  let mut t = Tracer::with_session_id(dir.path(), "s1").unwrap();
  t.start_trace(json!({"node_count": 1}));
  t.log_event("NODE_EXEC_START", json!({}), Some("a"));
  t.log_event("NODE_END", json!({"status": "SUCCESS"}), Some("a"));

  let events = read_trace_events(&dir.path().join(trace_file_name("s1"))).unwrap();
  let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
  assert_eq!(types, vec!["GRAPH_START", "NODE_EXEC_START", "NODE_END"]);
  assert!(events.iter().all(|e| e.trace_id == "s1"));
  assert_eq!(events[1].node_id.as_deref(), Some("a"));
  assert_eq!(events[0].data["graph_info"]["node_count"], json!(1));
}

#[test]
fn summary_tracks_decisions_errors_and_executed_nodes() {
  let dir = tempfile::tempdir().unwrap();
  let mut t = Tracer::with_session_id(dir.path(), "s2").unwrap();
  t.log_event("AGENT_DECISION", json!({"decision": "Proceed"}), Some("a"));
  t.log_event("NODE_END", json!({"status": "SUCCESS"}), Some("a"));
  t.log_event("NODE_END", json!({"status": "SUCCESS"}), Some("a"));
  t.log_event("NODE_ERROR", json!({"error": "boom"}), Some("b"));
  t.log_event("COMPOSER_STEP_END", json!({"status": "FAILED"}), Some("b"));

  let s = t.summary().unwrap();
  assert_eq!(s.status, "RUNNING");
  assert_eq!(s.nodes_executed, vec!["a"]);
  assert_eq!(s.agent_decisions.len(), 1);
  assert_eq!(s.agent_decisions[0].decision["decision"], json!("Proceed"));
  assert_eq!(s.error_events.len(), 2);
  assert_eq!(s.error_events[0].error, json!("boom"));
  assert_eq!(s.error_events[1].error, json!("Unknown"));
}

#[test]
fn failed_node_end_counts_as_error_only() {
  let dir = tempfile::tempdir().unwrap();
  let mut t = Tracer::with_session_id(dir.path(), "s4").unwrap();
  t.log_event("NODE_END", json!({"status": "SUCCESS"}), Some("a"));
  t.log_event("NODE_END", json!({"status": "FAILED", "error": "boom"}), Some("x"));
  t.log_event("AGENT_DECISION", json!({"status": "FAILED"}), Some("x"));

  let s = t.summary().unwrap();
  assert_eq!(s.nodes_executed, vec!["a"]);
  assert_eq!(s.error_events.len(), 1);
  assert_eq!(s.error_events[0].node_id.as_deref(), Some("x"));
  assert_eq!(s.error_events[0].error, json!("boom"));
  assert_eq!(s.agent_decisions.len(), 1);
}

#[test]
fn end_trace_writes_summary_and_releases_session() {
  let dir = tempfile::tempdir().unwrap();
  let mut t = Tracer::with_session_id(dir.path(), "s3").unwrap();
  t.log_event("NODE_END", json!({"status": "SUCCESS"}), Some("a"));
  let summary = t.end_trace("SUCCESS", json!({"a": {"x": 1}})).unwrap();
  assert_eq!(summary.status, "SUCCESS");
  assert!(summary.end_time.is_some());
  assert!(!t.is_active());

  let loaded = load_summary(&dir.path().join(summary_file_name("s3"))).unwrap();
  assert_eq!(loaded, summary);
  assert_eq!(loaded.final_results["a"]["x"], json!(1));

  let events = read_trace_events(&dir.path().join(trace_file_name("s3"))).unwrap();
  assert_eq!(events.last().unwrap().event_type, "GRAPH_END");
  assert_eq!(events.last().unwrap().data["final_status"], json!("SUCCESS"));

  // Released: later calls are no-ops.
  t.log_event("NODE_END", json!({}), Some("b"));
  let after = read_trace_events(&dir.path().join(trace_file_name("s3"))).unwrap();
  assert_eq!(after.len(), events.len());
}

#[test]
fn initialize_uses_fresh_uuid() {
  let dir = tempfile::tempdir().unwrap();
  let a = Tracer::initialize(dir.path()).unwrap();
  let b = Tracer::initialize(dir.path()).unwrap();
  assert_ne!(a.trace_id(), b.trace_id());
  assert!(uuid::Uuid::parse_str(a.trace_id().unwrap()).is_ok());
}
