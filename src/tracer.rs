//! Append-only trace of a run plus its derived session summary.
//!
//! A [`Tracer`] is an explicit handle owned by the caller and passed (through
//! [`crate::session::Session`]) to everything that emits events. Each event is one
//! JSON line in `trace_<id>.jsonl`, written with open/append/close so the file
//! can be read while the run is in progress. The summary is kept in memory and
//! written once to `summary_<id>.json` by [`Tracer::end_trace`].

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::node_io::{append_json_line, read_json_lines};
use crate::types::{DecisionRecord, ErrorRecord, SessionSummary, TraceEvent};

/// Default directory for trace and summary files.
pub const DEFAULT_TRACE_DIR: &str = "./scm_traces";

pub const AGENT_DECISION: &str = "AGENT_DECISION";
pub const NODE_ERROR: &str = "NODE_ERROR";
pub const NODE_END: &str = "NODE_END";
pub const GRAPH_START: &str = "GRAPH_START";
pub const GRAPH_END: &str = "GRAPH_END";

pub fn trace_file_name(trace_id: &str) -> String {
  format!("trace_{}.jsonl", trace_id)
}

pub fn summary_file_name(trace_id: &str) -> String {
  format!("summary_{}.json", trace_id)
}

fn now() -> String {
  chrono::Utc::now().to_rfc3339()
}

#[derive(Debug)]
struct TraceSession {
  output_dir: PathBuf,
  trace_path: PathBuf,
  summary: SessionSummary,
}

/// Session handle. Inactive (disabled or ended) tracers ignore every call.
#[derive(Debug)]
pub struct Tracer {
  session: Option<TraceSession>,
  warned: bool,
}

impl Tracer {
  /// Opens a session with a fresh UUID v4 id under `output_dir` (created).
  pub fn initialize(output_dir: &Path) -> std::io::Result<Self> {
    Self::with_session_id(output_dir, uuid::Uuid::new_v4().to_string())
  }

  #[instrument(level = "trace", skip(session_id))]
  pub fn with_session_id(output_dir: &Path, session_id: impl Into<String>) -> std::io::Result<Self> {
    let trace_id = session_id.into();
    std::fs::create_dir_all(output_dir)?;
    let trace_path = output_dir.join(trace_file_name(&trace_id));
    info!(trace_id = %trace_id, file = %trace_path.display(), "tracer initialized");
    Ok(Self {
      session: Some(TraceSession {
        output_dir: output_dir.to_path_buf(),
        trace_path,
        summary: SessionSummary::new(trace_id, now()),
      }),
      warned: false,
    })
  }

  /// A tracer without a session; every call is a no-op.
  pub fn disabled() -> Self {
    Self {
      session: None,
      warned: false,
    }
  }

  pub fn is_active(&self) -> bool {
    self.session.is_some()
  }

  pub fn trace_id(&self) -> Option<&str> {
    self.session.as_ref().map(|s| s.summary.trace_id.as_str())
  }

  pub fn trace_path(&self) -> Option<&Path> {
    self.session.as_ref().map(|s| s.trace_path.as_path())
  }

  /// In-progress summary of the active session.
  pub fn summary(&self) -> Option<&SessionSummary> {
    self.session.as_ref().map(|s| &s.summary)
  }

  fn active(&mut self) -> Option<&mut TraceSession> {
    if self.session.is_none() && !self.warned {
      warn!("tracer not initialized, trace events are dropped");
      self.warned = true;
    }
    self.session.as_mut()
  }

  /// Appends one event and folds it into the summary.
  pub fn log_event(&mut self, event_type: &str, data: Value, node_id: Option<&str>) {
    let Some(session) = self.active() else {
      return;
    };
    let event = TraceEvent {
      timestamp: now(),
      trace_id: session.summary.trace_id.clone(),
      event_type: event_type.to_string(),
      node_id: node_id.map(String::from),
      data,
    };
    if let Err(e) = append_json_line(&session.trace_path, &event) {
      error!(error = %e, file = %session.trace_path.display(), "cannot write trace event");
    }
    debug!(event_type, node_id = ?node_id, data = %event.data, "trace event");

    // First matching bucket only: a failed NODE_END is an error, not an executed node.
    let summary = &mut session.summary;
    if event_type == AGENT_DECISION {
      summary.agent_decisions.push(DecisionRecord {
        timestamp: event.timestamp.clone(),
        decision: event.data.clone(),
      });
    } else if event_type == NODE_ERROR
      || event.data.get("status").and_then(Value::as_str) == Some("FAILED")
    {
      summary.error_events.push(ErrorRecord {
        timestamp: event.timestamp.clone(),
        node_id: event.node_id.clone(),
        error: event
          .data
          .get("error")
          .cloned()
          .unwrap_or_else(|| Value::String("Unknown".to_string())),
      });
    } else if event_type == NODE_END {
      if let Some(id) = node_id {
        if !summary.nodes_executed.iter().any(|n| n == id) {
          summary.nodes_executed.push(id.to_string());
        }
      }
    }
  }

  /// Logs `GRAPH_START` with the given graph description.
  pub fn start_trace(&mut self, graph_info: Value) {
    self.log_event(
      GRAPH_START,
      serde_json::json!({"message": "Graph execution started.", "graph_info": graph_info}),
      None,
    );
  }

  /// Logs `GRAPH_END`, writes the summary file and releases the session.
  /// Returns the final summary, or `None` when no session was active.
  #[instrument(level = "trace", skip(self, final_results))]
  pub fn end_trace(&mut self, status: &str, final_results: Value) -> Option<SessionSummary> {
    if let Some(session) = self.active() {
      session.summary.end_time = Some(now());
      session.summary.status = status.to_string();
      session.summary.final_results = final_results;
    }
    self.log_event(
      GRAPH_END,
      serde_json::json!({
        "message": format!("Graph execution ended with status: {}", status),
        "final_status": status,
      }),
      None,
    );
    let session = self.session.take()?;
    let path = session
      .output_dir
      .join(summary_file_name(&session.summary.trace_id));
    match write_summary(&path, &session.summary) {
      Ok(()) => info!(file = %path.display(), status, "trace summary saved"),
      Err(e) => error!(error = %e, file = %path.display(), "cannot save trace summary"),
    }
    Some(session.summary)
  }
}

fn write_summary(path: &Path, summary: &SessionSummary) -> std::io::Result<()> {
  let json = serde_json::to_string_pretty(summary)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
  std::fs::write(path, json)
}

/// Reads every event of a trace file.
pub fn read_trace_events(path: &Path) -> std::io::Result<Vec<TraceEvent>> {
  read_json_lines(path)
}

/// Loads a summary written by [`Tracer::end_trace`].
pub fn load_summary(path: &Path) -> std::io::Result<SessionSummary> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
