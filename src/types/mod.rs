//! Data model shared by the store, graph, engine, tracer, controller and
//! adaptation manager.

mod adaptation_log_entry;
mod execution_metadata;
mod node;
mod run_outcome;
mod run_status;
#[cfg(test)]
mod run_status_test;
mod structure_evaluation;
mod trace_event;

pub use adaptation_log_entry::AdaptationLogEntry;
pub use execution_metadata::{ConfidenceSource, ExecutionMetadata, ExecutionMode, NodeResult};
pub use node::{
  AdaptationMethod, AdaptationStrategy, AdaptationTrigger, ConnectionType, Dependency,
  ExecutionLogic, InputSpec, LogSettings, LogicType, MetricSpec, Node, Observability,
  OutputSpec, ResilienceAction, ResiliencePolicy, SecurityPolicy, StateManagement,
};
pub use run_outcome::RunOutcome;
pub use run_status::RunStatus;
pub use structure_evaluation::{RiskLevel, StructureEvaluation};
pub use trace_event::{DecisionRecord, ErrorRecord, SessionSummary, TraceEvent};

/// Named values passed into and out of nodes.
pub type ValueMap = serde_json::Map<String, serde_json::Value>;
