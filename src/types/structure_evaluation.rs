//! Static, non-executing assessment of a node graph.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Risk derived from the number of public nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
  Low,
  Medium,
  High,
}

impl RiskLevel {
  /// More than two public nodes is High, any is Medium.
  pub fn from_public_count(count: usize) -> Self {
    if count > 2 {
      RiskLevel::High
    } else if count > 0 {
      RiskLevel::Medium
    } else {
      RiskLevel::Low
    }
  }
}

impl fmt::Display for RiskLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RiskLevel::Low => write!(f, "Low"),
      RiskLevel::Medium => write!(f, "Medium"),
      RiskLevel::High => write!(f, "High"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEvaluation {
  pub node_count: usize,
  pub public_node_count: usize,
  pub security_risk_level: RiskLevel,
  pub stateful_node_count: usize,
  pub fallback_policy_count: usize,
  pub adaptation_nodes_count: usize,
}
