//! Node file read/write (one JSON document per node, named `<id>.json`).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{instrument, warn};

use crate::error::{AdaptationError, LoadError};
use crate::types::Node;

/// Extension of node definition files.
pub const NODE_FILE_EXTENSION: &str = "json";

/// Path of the file holding node `id` under `dir`.
pub fn node_file_path(dir: &Path, id: &str) -> PathBuf {
  dir.join(format!("{}.{}", id, NODE_FILE_EXTENSION))
}

/// Reads `path` as an untyped JSON document, for schema validation before decoding.
#[instrument(level = "trace", skip(path))]
pub fn read_node_value(path: &Path) -> Result<Value, LoadError> {
  let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  serde_json::from_slice(&bytes).map_err(|source| LoadError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Decodes an already-read document into a typed node.
pub fn decode_node(path: &Path, value: Value) -> Result<Node, LoadError> {
  serde_json::from_value(value).map_err(|source| LoadError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Reads and decodes a node file without schema validation.
pub fn load_node(path: &Path) -> Result<Node, LoadError> {
  let value = read_node_value(path)?;
  decode_node(path, value)
}

/// Writes `node` to `path`, refusing to replace an existing file. Creates the
/// parent directory if needed.
#[instrument(level = "trace", skip(path, node))]
pub fn save_new_node(path: &Path, node: &Node) -> Result<(), AdaptationError> {
  let json = serde_json::to_string_pretty(node)?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).map_err(|source| AdaptationError::Persist {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
    Ok(f) => f,
    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
      return Err(AdaptationError::AlreadyExists(path.to_path_buf()));
    }
    Err(source) => {
      return Err(AdaptationError::Persist {
        path: path.to_path_buf(),
        source,
      });
    }
  };
  let written = file
    .write_all(json.as_bytes())
    .and_then(|_| file.write_all(b"\n"));
  if let Err(source) = written {
    drop(file);
    remove_partial_file(path);
    return Err(AdaptationError::Persist {
      path: path.to_path_buf(),
      source,
    });
  }
  Ok(())
}

/// Removes a half-written node file. Returns false (and warns) when the
/// file could not be removed.
pub(crate) fn remove_partial_file(path: &Path) -> bool {
  match std::fs::remove_file(path) {
    Ok(()) => true,
    Err(e) => {
      warn!(error = %e, file = %path.display(), "cannot remove partially written node");
      false
    }
  }
}

/// Appends one JSON line to `path` (open, write, close). Creates the parent
/// directory if needed.
pub(crate) fn append_json_line<T: serde::Serialize>(
  path: &Path,
  record: &T,
) -> Result<(), std::io::Error> {
  let line = serde_json::to_string(record)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      std::fs::create_dir_all(parent)?;
    }
  }
  let mut file = OpenOptions::new().create(true).append(true).open(path)?;
  file.write_all(line.as_bytes())?;
  file.write_all(b"\n")
}

/// Reads every non-empty line of a JSON-lines file.
pub(crate) fn read_json_lines<T: serde::de::DeserializeOwned>(
  path: &Path,
) -> Result<Vec<T>, std::io::Error> {
  let text = std::fs::read_to_string(path)?;
  text
    .lines()
    .filter(|l| !l.trim().is_empty())
    .map(|l| {
      serde_json::from_str(l).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
    .collect()
}
