//! A declaratively-defined computation node, as stored in one JSON file.
//!
//! Field names on disk follow the node file format (`@id`, `purpose_statement`,
//! `input_name`, ...). Closed vocabularies keep unknown spellings in an `Other`
//! variant so callers can report them instead of failing to decode.

use serde::{Deserialize, Serialize};

use super::ValueMap;

/// One computation node. Never mutated after creation: adaptation clones it and
/// writes the clone under a new identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  #[serde(rename = "@id")]
  pub id: String,
  pub version: String,
  #[serde(rename = "purpose_statement", default)]
  pub purpose: String,
  pub execution_logic: ExecutionLogic,
  #[serde(default)]
  pub inputs: Vec<InputSpec>,
  #[serde(default)]
  pub outputs: Vec<OutputSpec>,
  #[serde(default)]
  pub depends_on: Vec<Dependency>,
  #[serde(default)]
  pub security_policy: SecurityPolicy,
  #[serde(default)]
  pub state_management: StateManagement,
  #[serde(default)]
  pub resilience_policy: Vec<ResiliencePolicy>,
  #[serde(default)]
  pub observability: Observability,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub adaptation_strategy: Option<AdaptationStrategy>,
  #[serde(default)]
  pub rationale: String,
  #[serde(rename = "author_agent_ref", default)]
  pub author_ref: String,
  #[serde(default)]
  pub creation_timestamp: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub derived_from: Option<String>,
  /// Keys this crate does not interpret; kept so rewritten nodes lose nothing.
  #[serde(flatten)]
  pub extra: ValueMap,
}

impl Node {
  /// Declared input names in order.
  pub fn input_names(&self) -> Vec<&str> {
    self.inputs.iter().map(|i| i.name.as_str()).collect()
  }

  /// Declared output names in order.
  pub fn output_names(&self) -> Vec<&str> {
    self.outputs.iter().map(|o| o.name.as_str()).collect()
  }

  /// True when the node's access level is `Public`.
  pub fn is_public(&self) -> bool {
    self.security_policy.access_level == "Public"
  }

  pub fn has_adaptation_strategy(&self) -> bool {
    self.adaptation_strategy.is_some()
  }
}

/// How a node computes its outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogic {
  #[serde(rename = "type")]
  pub kind: LogicType,
  #[serde(default)]
  pub reference: String,
  #[serde(default)]
  pub parameters: ValueMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicType {
  #[serde(rename = "Model_Ref")]
  ModelRef,
  #[serde(rename = "Subgraph_Ref")]
  SubgraphRef,
  #[serde(rename = "External_Call")]
  ExternalCall,
  #[serde(untagged)]
  Other(String),
}

impl LogicType {
  pub fn as_str(&self) -> &str {
    match self {
      LogicType::ModelRef => "Model_Ref",
      LogicType::SubgraphRef => "Subgraph_Ref",
      LogicType::ExternalCall => "External_Call",
      LogicType::Other(s) => s,
    }
  }
}

/// A declared input: name, type tag, and optionally the node that produces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
  #[serde(rename = "input_name")]
  pub name: String,
  #[serde(rename = "data_type_ref", default)]
  pub type_tag: String,
  /// Producing node id, or `external_parameter` for values supplied from outside.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
  #[serde(rename = "output_name")]
  pub name: String,
  #[serde(rename = "data_type_ref", default)]
  pub type_tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
  #[serde(default)]
  pub node_ref: String,
  #[serde(default)]
  pub connection_type: ConnectionType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionType {
  #[default]
  DataFlow,
  ControlFlow,
}

/// Access-level tag. Descriptive only; nothing enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPolicy {
  #[serde(default = "default_access_level")]
  pub access_level: String,
}

impl Default for SecurityPolicy {
  fn default() -> Self {
    Self {
      access_level: default_access_level(),
    }
  }
}

fn default_access_level() -> String {
  "Internal".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateManagement {
  #[serde(rename = "type", default = "default_state_type")]
  pub kind: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub memory_ref: Option<String>,
}

impl StateManagement {
  /// Stateful and Contextual nodes rely on an external store.
  pub fn is_stateful(&self) -> bool {
    matches!(self.kind.as_str(), "Stateful" | "Contextual")
  }
}

impl Default for StateManagement {
  fn default() -> Self {
    Self {
      kind: default_state_type(),
      memory_ref: None,
    }
  }
}

fn default_state_type() -> String {
  "Ephemeral".to_string()
}

/// A declared condition/action pair. The condition is free text; it is consulted
/// by the agent controller, never evaluated as an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResiliencePolicy {
  #[serde(default)]
  pub condition: String,
  pub action: ResilienceAction,
  #[serde(default)]
  pub action_params: ValueMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResilienceAction {
  Fallback,
  Alert,
  Retry,
  #[serde(untagged)]
  Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observability {
  #[serde(default)]
  pub metrics: Vec<MetricSpec>,
  #[serde(default)]
  pub logs: LogSettings,
  #[serde(default)]
  pub trace_propagation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
  pub metric_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
  #[serde(default = "default_log_level")]
  pub level: String,
  #[serde(default = "default_log_content")]
  pub content: String,
}

impl Default for LogSettings {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      content: default_log_content(),
    }
  }
}

fn default_log_level() -> String {
  "Info".to_string()
}

fn default_log_content() -> String {
  "Standard".to_string()
}

/// When and how a node should produce a superseding version of itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationStrategy {
  pub trigger: AdaptationTrigger,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metric_ref: Option<String>,
  pub method: AdaptationMethod,
  #[serde(default)]
  pub method_params: ValueMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdaptationTrigger {
  #[serde(rename = "Performance_Degradation")]
  PerformanceDegradation,
  #[serde(rename = "External_Feedback")]
  ExternalFeedback,
  #[serde(rename = "Scheduled_Review")]
  ScheduledReview,
  #[serde(rename = "Manual_Trigger")]
  ManualTrigger,
  #[serde(untagged)]
  Other(String),
}

impl AdaptationTrigger {
  pub fn as_str(&self) -> &str {
    match self {
      AdaptationTrigger::PerformanceDegradation => "Performance_Degradation",
      AdaptationTrigger::ExternalFeedback => "External_Feedback",
      AdaptationTrigger::ScheduledReview => "Scheduled_Review",
      AdaptationTrigger::ManualTrigger => "Manual_Trigger",
      AdaptationTrigger::Other(s) => s,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdaptationMethod {
  #[serde(rename = "Retrain_Model")]
  RetrainModel,
  #[serde(rename = "Adjust_Parameters")]
  AdjustParameters,
  #[serde(rename = "Select_New_Algorithm")]
  SelectNewAlgorithm,
  #[serde(rename = "Trigger_Human_Review")]
  TriggerHumanReview,
  #[serde(rename = "Evolve_Structure")]
  EvolveStructure,
  #[serde(untagged)]
  Other(String),
}

impl AdaptationMethod {
  pub fn as_str(&self) -> &str {
    match self {
      AdaptationMethod::RetrainModel => "Retrain_Model",
      AdaptationMethod::AdjustParameters => "Adjust_Parameters",
      AdaptationMethod::SelectNewAlgorithm => "Select_New_Algorithm",
      AdaptationMethod::TriggerHumanReview => "Trigger_Human_Review",
      AdaptationMethod::EvolveStructure => "Evolve_Structure",
      AdaptationMethod::Other(s) => s,
    }
  }
}
