//! Run configuration shared by the library entry points and the `scm` binary.

use std::env;
use std::path::{Path, PathBuf};

use crate::adaptation::{ADAPTATION_LOG_FILE, AdaptationManager, DEFAULT_AGENT_REF};
use crate::tracer::DEFAULT_TRACE_DIR;

/// Overrides `trace_dir` when set.
pub const TRACE_DIR_ENV: &str = "SCM_TRACE_DIR";
/// Overrides `adaptation_log` when set.
pub const ADAPTATION_LOG_ENV: &str = "SCM_ADAPTATION_LOG";

/// Where a run reads nodes and writes traces, adapted nodes and the
/// adaptation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
  /// Directory of node files. Adapted nodes are written here too.
  pub nodes_dir: PathBuf,
  /// Directory for trace and summary files.
  pub trace_dir: PathBuf,
  /// Adaptation log file. Default: `<trace_dir>/adaptation_log.jsonl`.
  pub adaptation_log: Option<PathBuf>,
  /// Author recorded on adapted nodes.
  pub agent_ref: String,
}

impl RunOptions {
  pub fn new(nodes_dir: impl Into<PathBuf>) -> Self {
    Self {
      nodes_dir: nodes_dir.into(),
      trace_dir: PathBuf::from(DEFAULT_TRACE_DIR),
      adaptation_log: None,
      agent_ref: DEFAULT_AGENT_REF.to_string(),
    }
  }

  /// Applies `SCM_TRACE_DIR` and `SCM_ADAPTATION_LOG` when they are set.
  pub fn apply_env(self) -> Self {
    self.with_overrides(
      env::var(TRACE_DIR_ENV).ok(),
      env::var(ADAPTATION_LOG_ENV).ok(),
    )
  }

  /// Replaces `trace_dir` / `adaptation_log` with the non-empty values given.
  pub fn with_overrides(mut self, trace_dir: Option<String>, adaptation_log: Option<String>) -> Self {
    if let Some(dir) = trace_dir.filter(|s| !s.is_empty()) {
      self.trace_dir = PathBuf::from(dir);
    }
    if let Some(log) = adaptation_log.filter(|s| !s.is_empty()) {
      self.adaptation_log = Some(PathBuf::from(log));
    }
    self
  }

  pub fn nodes_dir(&self) -> &Path {
    &self.nodes_dir
  }

  /// Effective adaptation log path.
  pub fn adaptation_log_path(&self) -> PathBuf {
    self
      .adaptation_log
      .clone()
      .unwrap_or_else(|| self.trace_dir.join(ADAPTATION_LOG_FILE))
  }

  /// Adaptation manager writing into `nodes_dir` and the effective log.
  pub fn adaptation_manager(&self) -> AdaptationManager {
    AdaptationManager::new(&self.nodes_dir, self.adaptation_log_path())
      .with_agent_ref(self.agent_ref.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let o = RunOptions::new("nodes");
    assert_eq!(o.trace_dir, PathBuf::from("./scm_traces"));
    assert_eq!(
      o.adaptation_log_path(),
      PathBuf::from("./scm_traces").join("adaptation_log.jsonl")
    );
    assert_eq!(o.agent_ref, "agent_adaptor_v1");
  }

  #[test]
  fn log_follows_trace_dir_unless_set() {
    let o = RunOptions::new("nodes").with_overrides(Some("/tmp/t".into()), None);
    assert_eq!(o.adaptation_log_path(), PathBuf::from("/tmp/t/adaptation_log.jsonl"));

    let o = o.with_overrides(None, Some("/var/log/adapt.jsonl".into()));
    assert_eq!(o.trace_dir, PathBuf::from("/tmp/t"));
    assert_eq!(o.adaptation_log_path(), PathBuf::from("/var/log/adapt.jsonl"));
  }

  #[test]
  fn empty_overrides_are_ignored() {
    let o = RunOptions::new("nodes").with_overrides(Some(String::new()), Some(String::new()));
    assert_eq!(o, RunOptions::new("nodes"));
  }

  #[test]
  fn manager_uses_options() {
    let mut o = RunOptions::new("nodes");
    o.agent_ref = "agent_custom".to_string();
    let m = o.adaptation_manager();
    assert_eq!(m.nodes_dir(), Path::new("nodes"));
    assert_eq!(m.agent_ref(), "agent_custom");
    assert_eq!(m.log_path(), o.adaptation_log_path());
  }
}
