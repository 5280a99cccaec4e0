//! Records written by the tracer: one event per line, one summary per session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of the append-only event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
  pub timestamp: String,
  pub trace_id: String,
  pub event_type: String,
  pub node_id: Option<String>,
  pub data: Value,
}

/// An error observed during the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
  pub timestamp: String,
  pub node_id: Option<String>,
  pub error: Value,
}

/// An agent decision observed during the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
  pub timestamp: String,
  pub decision: Value,
}

/// Aggregate of a trace session, rewritten wholesale when the session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
  pub trace_id: String,
  pub start_time: String,
  pub end_time: Option<String>,
  pub status: String,
  pub nodes_executed: Vec<String>,
  pub error_events: Vec<ErrorRecord>,
  pub agent_decisions: Vec<DecisionRecord>,
  pub final_results: Value,
}

impl SessionSummary {
  pub fn new(trace_id: impl Into<String>, start_time: impl Into<String>) -> Self {
    Self {
      trace_id: trace_id.into(),
      start_time: start_time.into(),
      end_time: None,
      status: "RUNNING".to_string(),
      nodes_executed: vec![],
      error_events: vec![],
      agent_decisions: vec![],
      final_results: Value::Null,
    }
  }
}
