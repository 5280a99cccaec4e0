//! Tests for `RunStatus`.

use super::RunStatus;

#[test]
fn display_success() {
  assert_eq!(RunStatus::Success.to_string(), "SUCCESS");
}

#[test]
fn display_halted() {
  assert_eq!(RunStatus::Halted.to_string(), "HALTED");
}

#[test]
fn display_failed() {
  assert_eq!(RunStatus::Failed.to_string(), "FAILED");
}

#[test]
fn serializes_upper_case() {
  assert_eq!(
    serde_json::to_value(RunStatus::Halted).unwrap(),
    serde_json::json!("HALTED")
  );
}
