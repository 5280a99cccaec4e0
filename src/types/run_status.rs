//! Terminal status of a run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
  Success,
  Halted,
  Failed,
}

impl fmt::Display for RunStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RunStatus::Success => write!(f, "SUCCESS"),
      RunStatus::Halted => write!(f, "HALTED"),
      RunStatus::Failed => write!(f, "FAILED"),
    }
  }
}
