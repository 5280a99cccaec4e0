//! Per-node execution result and metadata captured by the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ValueMap;

/// How a node's result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
  RealModelAttempt,
  RealModelSuccess,
  Simulation,
  SimulationFallback,
}

impl fmt::Display for ExecutionMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ExecutionMode::RealModelAttempt => write!(f, "real_model_attempt"),
      ExecutionMode::RealModelSuccess => write!(f, "real_model_success"),
      ExecutionMode::Simulation => write!(f, "simulation"),
      ExecutionMode::SimulationFallback => write!(f, "simulation_fallback"),
    }
  }
}

/// Where the recorded confidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
  Model,
  Simulation,
  None,
}

/// Timing, mode and confidence for one node execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
  pub execution_duration_ms: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub execution_mode: Option<ExecutionMode>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub confidence_source: Option<ConfidenceSource>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub simulated_confidence: Option<f64>,
}

/// Output mapping of a node, or an error marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeResult {
  Error { error: String },
  Outputs(ValueMap),
}

impl NodeResult {
  pub fn error(message: impl Into<String>) -> Self {
    NodeResult::Error {
      error: message.into(),
    }
  }

  pub fn outputs(&self) -> Option<&ValueMap> {
    match self {
      NodeResult::Outputs(map) => Some(map),
      NodeResult::Error { .. } => None,
    }
  }

  pub fn is_error(&self) -> bool {
    matches!(self, NodeResult::Error { .. })
  }
}
