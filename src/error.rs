//! Error types for loading, planning, executing and adapting nodes.
//!
//! Store, graph and plan errors abort a run before any node executes. Execution
//! errors stop the run at the failing node. Plugin and adaptation errors are
//! absorbed where they occur and only reach the trace.

use std::path::PathBuf;

use thiserror::Error;

/// A node file could not be read or decoded.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("cannot read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("cannot parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// A node definition did not satisfy the node schema.
#[derive(Debug, Error)]
pub enum ValidationError {
  #[error("invalid schema document: {0}")]
  InvalidSchema(String),
  #[error("node failed schema validation: {}", .0.join("; "))]
  Rejected(Vec<String>),
}

/// Loading a node directory failed as a whole.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("node directory not found: {0}")]
  MissingDirectory(PathBuf),
  #[error(transparent)]
  Load(#[from] LoadError),
  #[error("no valid nodes found in {0}")]
  Empty(PathBuf),
}

/// One unresolved `depends_on` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDependency {
  pub node_id: String,
  pub missing_ref: String,
}

/// Graph construction found dependencies that do not resolve to loaded nodes.
#[derive(Debug, Error)]
#[error("unresolved dependencies: {}", describe_missing(.missing))]
pub struct DependencyError {
  pub missing: Vec<MissingDependency>,
}

impl DependencyError {
  /// Ids referenced by some node but absent from the store.
  pub fn missing_refs(&self) -> Vec<&str> {
    self.missing.iter().map(|m| m.missing_ref.as_str()).collect()
  }
}

fn describe_missing(missing: &[MissingDependency]) -> String {
  missing
    .iter()
    .map(|m| {
      if m.missing_ref.is_empty() {
        format!("{} -> <empty node_ref>", m.node_id)
      } else {
        format!("{} -> {}", m.node_id, m.missing_ref)
      }
    })
    .collect::<Vec<_>>()
    .join(", ")
}

/// The dependency relation is not acyclic.
#[derive(Debug, Error)]
#[error("cycle detected among nodes: {}", .nodes.join(", "))]
pub struct CycleError {
  /// Nodes whose in-degree stayed above zero after planning, in load order.
  pub nodes: Vec<String>,
}

/// A single node could not be executed.
#[derive(Debug, Error)]
pub enum ExecutionError {
  #[error("node not loaded")]
  NotLoaded,
  #[error("unsupported execution type: {0}")]
  UnsupportedType(String),
  #[error("execution produced no result (mode: {mode})")]
  EmptyResult { mode: String },
  #[error("node '{node_id}' requires input '{input}' from '{source_node}', which did not produce it")]
  MissingInput {
    node_id: String,
    input: String,
    source_node: String,
  },
}

/// A model plugin was missing or broke its call contract. Always soft: the
/// engine falls back to simulation.
#[derive(Debug, Error)]
pub enum PluginError {
  #[error("no plugin registered for reference '{0}'")]
  NotFound(String),
  #[error("plugin failed: {0}")]
  Failed(String),
  #[error("plugin returned a non-object value")]
  NotAMapping,
  #[error("plugin output missing declared keys: {}", .0.join(", "))]
  MissingOutputs(Vec<String>),
}

/// Writing an adapted node or its log entry failed.
#[derive(Debug, Error)]
pub enum AdaptationError {
  #[error("adapted node file already exists: {0}")]
  AlreadyExists(PathBuf),
  #[error("cannot write {path}: {source}")]
  Persist {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("cannot serialize adapted node: {0}")]
  Serialize(#[from] serde_json::Error),
}

impl AdaptationError {
  /// The successor file exists from an earlier run; nothing was written.
  pub fn is_already_adapted(&self) -> bool {
    matches!(self, AdaptationError::AlreadyExists(_))
  }
}

/// Loading, graph construction or planning failed before execution.
#[derive(Debug, Error)]
pub enum ComposeError {
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error(transparent)]
  Dependency(#[from] DependencyError),
  #[error(transparent)]
  Cycle(#[from] CycleError),
}
