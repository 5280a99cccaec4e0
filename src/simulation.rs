//! Typed stand-ins for node inputs and outputs.
//!
//! Values are chosen by a case-insensitive substring match on the declared type
//! tag (`data_type_ref`). Inputs and outputs use different ranges: inputs look
//! like raw data, outputs like model results.

use std::ops::Range;
use std::time::Duration;

use rand::{Rng, RngCore};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::types::{InputSpec, OutputSpec, ValueMap};

/// Output key added when no declared output carries a confidence.
pub const CONFIDENCE_KEY: &str = "confidence";

/// Simulated processing time per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationProfile {
  pub latency_ms: Range<u64>,
}

impl SimulationProfile {
  /// No sleep at all.
  pub fn instant() -> Self {
    Self { latency_ms: 0..0 }
  }

  fn pause(&self, rng: &mut dyn RngCore) {
    if self.latency_ms.is_empty() {
      return;
    }
    let ms = rng.gen_range(self.latency_ms.clone());
    std::thread::sleep(Duration::from_millis(ms));
  }
}

impl Default for SimulationProfile {
  fn default() -> Self {
    Self { latency_ms: 100..500 }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
  Timeseries,
  ScalarFloat,
  ScalarInt,
  Text,
  Boolean,
  Object,
  Unknown,
}

impl ValueKind {
  fn of(type_tag: &str) -> Self {
    let tag = type_tag.to_lowercase();
    if tag.contains("timeseries") {
      ValueKind::Timeseries
    } else if tag.contains("scalar_float") {
      ValueKind::ScalarFloat
    } else if tag.contains("scalar_int") {
      ValueKind::ScalarInt
    } else if tag.contains("string") {
      ValueKind::Text
    } else if tag.contains("boolean") {
      ValueKind::Boolean
    } else if tag.contains("dict") || tag.contains("object") {
      ValueKind::Object
    } else {
      ValueKind::Unknown
    }
  }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
  let factor = 10f64.powi(places);
  (value * factor).round() / factor
}

fn series(rng: &mut dyn RngCore, len: Range<usize>) -> Value {
  let n = rng.gen_range(len);
  Value::Array((0..n).map(|_| json!(rng.gen_range(50..=150))).collect())
}

fn mock_input_value(name: &str, type_tag: &str, rng: &mut dyn RngCore) -> Value {
  match ValueKind::of(type_tag) {
    ValueKind::Timeseries => series(rng, 5..16),
    ValueKind::ScalarFloat => json!(round_to(rng.gen_range(0.0..=100.0), 4)),
    ValueKind::ScalarInt => json!(rng.gen_range(0..=1000)),
    ValueKind::Text => json!(format!("mock_string_data_{}", rng.gen_range(100..=999))),
    ValueKind::Boolean => json!(rng.gen_bool(0.5)),
    ValueKind::Object => json!({
      "mock_key": format!("value_{}", rng.gen_range(1..=5)),
      "mock_flag": rng.gen_bool(0.5),
    }),
    ValueKind::Unknown => json!(format!("mock_data_for_{}", name)),
  }
}

fn mock_output_value(type_tag: &str, rng: &mut dyn RngCore) -> Value {
  match ValueKind::of(type_tag) {
    ValueKind::Timeseries => series(rng, 3..8),
    ValueKind::ScalarFloat => json!(round_to(rng.gen_range(0.0..=1.0), 4)),
    ValueKind::ScalarInt => json!(rng.gen_range(100..=500)),
    ValueKind::Text => json!(format!("mock_result_string_{}", rng.gen_range(1000..=9999))),
    ValueKind::Boolean => json!(rng.gen_bool(0.5)),
    ValueKind::Object => json!({
      "sim_key": format!("sim_val_{}", rng.gen_range(1..=5)),
      "status": "generated",
    }),
    ValueKind::Unknown => json!(format!("mock_output_for_{}", type_tag)),
  }
}

/// One mock value per declared input, typed by its tag.
pub fn mock_inputs(inputs: &[InputSpec], rng: &mut dyn RngCore) -> ValueMap {
  let mut out = ValueMap::new();
  for input in inputs.iter().filter(|i| !i.name.is_empty()) {
    let value = mock_input_value(&input.name, &input.type_tag, rng);
    debug!(input = %input.name, type_tag = %input.type_tag, "generated mock input");
    out.insert(input.name.clone(), value);
  }
  out
}

/// Untyped `mock_data_for_<name>` markers, used when a model call falls back to
/// simulation and its real inputs are not passed on.
pub fn placeholder_inputs(inputs: &[InputSpec]) -> ValueMap {
  inputs
    .iter()
    .map(|i| (i.name.clone(), json!(format!("mock_data_for_{}", i.name))))
    .collect()
}

/// Simulates one call of kind `kind` (`model`, `subgraph`, `external call`):
/// sleeps per `profile`, then produces one value per declared output and a
/// `confidence` in `[0.5, 0.99]` unless some output name already mentions it.
pub fn simulate_outputs(
  kind: &str,
  reference: &str,
  params: &ValueMap,
  outputs: &[OutputSpec],
  profile: &SimulationProfile,
  rng: &mut dyn RngCore,
) -> ValueMap {
  info!(kind, reference, params = ?params, "simulating execution");
  profile.pause(rng);

  let mut result = ValueMap::new();
  for output in outputs.iter().filter(|o| !o.name.is_empty()) {
    result.insert(output.name.clone(), mock_output_value(&output.type_tag, rng));
  }
  if !result.keys().any(|k| k.to_lowercase().contains(CONFIDENCE_KEY)) {
    result.insert(
      CONFIDENCE_KEY.to_string(),
      json!(round_to(rng.gen_range(0.5..=0.99), 4)),
    );
  }
  info!(kind, outputs = ?result.keys().collect::<Vec<_>>(), "simulated execution complete");
  result
}
