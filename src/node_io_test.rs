//! Tests for node file and JSON-lines helpers.

use crate::error::{AdaptationError, LoadError};
use crate::node_io::{
  append_json_line, load_node, node_file_path, read_json_lines, read_node_value,
  remove_partial_file, save_new_node,
};
use crate::test_support::{node, node_value, write_json};
use serde_json::json;

#[test]
fn node_file_path_uses_id_and_extension() {
  let p = node_file_path(std::path::Path::new("/tmp/nodes"), "a_v1.0.0");
  assert_eq!(p, std::path::PathBuf::from("/tmp/nodes/a_v1.0.0.json"));
}

#[test]
fn load_node_reads_written_document() {
  let dir = tempfile::tempdir().unwrap();
  let path = write_json(dir.path(), "a.json", &node_value("a_v1.0.0", &[]));
  let n = load_node(&path).unwrap();
  assert_eq!(n.id, "a_v1.0.0");
  assert_eq!(n.output_names(), vec!["value"]);
}

#[test]
fn read_missing_file_is_io_error() {
  let dir = tempfile::tempdir().unwrap();
  let r = read_node_value(&dir.path().join("nope.json"));
  assert!(matches!(r, Err(LoadError::Io { .. })));
}

#[test]
fn read_garbage_is_parse_error() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("bad.json");
  std::fs::write(&path, "{ not json").unwrap();
  assert!(matches!(read_node_value(&path), Err(LoadError::Parse { .. })));
}

#[test]
fn save_new_node_refuses_to_overwrite() {
  let dir = tempfile::tempdir().unwrap();
  let path = node_file_path(dir.path(), "a_v1.0.0");
  save_new_node(&path, &node("a_v1.0.0", &[])).unwrap();
  let before = std::fs::read_to_string(&path).unwrap();

  let mut other = node("a_v1.0.0", &[]);
  other.rationale = "changed".to_string();
  let r = save_new_node(&path, &other);
  assert!(matches!(r, Err(AdaptationError::AlreadyExists(_))));
  assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn save_new_node_creates_parent_directory() {
  let dir = tempfile::tempdir().unwrap();
  let path = node_file_path(&dir.path().join("nested"), "a_v1.1.0");
  save_new_node(&path, &node("a_v1.1.0", &[])).unwrap();
  assert_eq!(load_node(&path).unwrap().id, "a_v1.1.0");
}

#[test]
fn remove_partial_file_reports_failure() {
  let dir = tempfile::tempdir().unwrap();
  let path = node_file_path(dir.path(), "a_v1.1.0");
  std::fs::write(&path, "{").unwrap();
  assert!(remove_partial_file(&path));
  assert!(!path.exists());
  assert!(!remove_partial_file(&path));
}

#[test]
fn json_lines_append_in_order() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("logs").join("events.jsonl");
  append_json_line(&path, &json!({"n": 1})).unwrap();
  append_json_line(&path, &json!({"n": 2})).unwrap();
  let lines: Vec<serde_json::Value> = read_json_lines(&path).unwrap();
  assert_eq!(lines, vec![json!({"n": 1}), json!({"n": 2})]);
}
