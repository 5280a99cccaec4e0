//! One line of the adaptation log.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ValueMap;

/// Provenance of one adaptation: which node was superseded, by what, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationLogEntry {
  pub original_node_id: String,
  pub original_version: String,
  pub new_node_id: String,
  pub new_version: String,
  pub adaptation_trigger: String,
  pub trigger_details: Value,
  pub adaptation_method: String,
  pub method_params: ValueMap,
  pub rationale: String,
  pub adapting_agent: String,
  pub adaptation_timestamp: String,
  pub log_timestamp: String,
}
