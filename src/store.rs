//! Loads node definitions from a directory and indexes them by identifier.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::node_io::{NODE_FILE_EXTENSION, decode_node, read_node_value};
use crate::schema::NodeValidator;
use crate::types::Node;

/// A loaded node and the file it came from.
#[derive(Debug, Clone)]
pub struct StoredNode {
  pub node: Node,
  pub path: PathBuf,
}

/// Valid nodes of one directory, in load order.
#[derive(Debug, Clone)]
pub struct NodeStore {
  dir: PathBuf,
  entries: Vec<StoredNode>,
  index: HashMap<String, usize>,
}

impl NodeStore {
  /// Loads every `*.json` file of `dir` (sorted by file name). Files that fail
  /// to parse, validate or decode are skipped with a warning. Fails only when
  /// the directory is missing or yields no valid node.
  #[instrument(level = "trace", skip(validator))]
  pub fn load(dir: &Path, validator: &dyn NodeValidator) -> Result<Self, StoreError> {
    info!(dir = %dir.display(), "loading nodes");
    if !dir.is_dir() {
      return Err(StoreError::MissingDirectory(dir.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
      .map_err(|source| crate::error::LoadError::Io {
        path: dir.to_path_buf(),
        source,
      })?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == NODE_FILE_EXTENSION))
      .collect();
    files.sort();

    let mut store = NodeStore {
      dir: dir.to_path_buf(),
      entries: vec![],
      index: HashMap::new(),
    };
    for path in files {
      let value = match read_node_value(&path) {
        Ok(v) => v,
        Err(e) => {
          warn!(error = %e, "skipping unreadable node file");
          continue;
        }
      };
      if value.get("@id").and_then(|v| v.as_str()).is_none() {
        warn!(file = %path.display(), "skipping node file without '@id'");
        continue;
      }
      if !validator.validate(&value) {
        warn!(file = %path.display(), "skipping invalid node file");
        continue;
      }
      match decode_node(&path, value) {
        Ok(node) => {
          debug!(node_id = %node.id, file = %path.display(), "loaded node");
          store.insert(node, path);
        }
        Err(e) => warn!(error = %e, "skipping undecodable node file"),
      }
    }

    if store.entries.is_empty() {
      return Err(StoreError::Empty(dir.to_path_buf()));
    }
    info!(count = store.entries.len(), "loaded valid nodes");
    Ok(store)
  }

  /// Builds a store from nodes already in memory; paths are `<dir>/<id>.json`.
  pub fn from_nodes(dir: &Path, nodes: impl IntoIterator<Item = Node>) -> Self {
    let mut store = NodeStore {
      dir: dir.to_path_buf(),
      entries: vec![],
      index: HashMap::new(),
    };
    for node in nodes {
      let path = crate::node_io::node_file_path(dir, &node.id);
      store.insert(node, path);
    }
    store
  }

  /// Last one wins; the entry keeps the position of the first occurrence.
  fn insert(&mut self, node: Node, path: PathBuf) {
    match self.index.get(&node.id) {
      Some(&i) => {
        warn!(
          node_id = %node.id,
          previous = %self.entries[i].path.display(),
          replacement = %path.display(),
          "duplicate node id, last loaded wins"
        );
        self.entries[i] = StoredNode { node, path };
      }
      None => {
        self.index.insert(node.id.clone(), self.entries.len());
        self.entries.push(StoredNode { node, path });
      }
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn get(&self, id: &str) -> Option<&Node> {
    self.index.get(id).map(|&i| &self.entries[i].node)
  }

  pub fn path_of(&self, id: &str) -> Option<&Path> {
    self.index.get(id).map(|&i| self.entries[i].path.as_path())
  }

  pub fn contains(&self, id: &str) -> bool {
    self.index.contains_key(id)
  }

  /// Node ids in load order.
  pub fn ids(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|e| e.node.id.as_str())
  }

  /// Nodes in load order.
  pub fn iter(&self) -> impl Iterator<Item = &StoredNode> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
