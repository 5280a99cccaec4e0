//! Demo forecasters registered under their model references.

use rand::Rng;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::PluginError;
use crate::plugins::PluginRegistry;
use crate::simulation::round_to;
use crate::types::ValueMap;

pub const RANDOM_FORECASTER_REF: &str = "model_random_forecaster_v1.0.0";
pub const LSTM_SALES_PREDICTOR_REF: &str = "model_lstm_sales_predictor_v3.2.0";

/// Confidence the LSTM stand-in always reports, low enough to exercise
/// post-check and adaptation paths.
pub const LSTM_FIXED_CONFIDENCE: f64 = 0.7;

fn param_usize(params: &ValueMap, key: &str, default: usize) -> usize {
  params
    .get(key)
    .and_then(Value::as_u64)
    .map(|v| v as usize)
    .unwrap_or(default)
}

/// `random_forecast` of `prediction_horizon` (default 3) ints in `50..=200`
/// and a `prediction_confidence` in `[0.5, 0.99]`.
pub fn random_forecaster(inputs: &ValueMap, params: &ValueMap) -> Result<Value, PluginError> {
  info!(model = RANDOM_FORECASTER_REF, inputs = ?inputs.keys().collect::<Vec<_>>(), "running model");
  let mut rng = rand::thread_rng();
  let horizon = param_usize(params, "prediction_horizon", 3);
  let forecast: Vec<i64> = (0..horizon).map(|_| rng.gen_range(50..=200)).collect();
  Ok(json!({
    "random_forecast": forecast,
    "prediction_confidence": round_to(rng.gen_range(0.5..0.99), 4),
  }))
}

/// `monthly_forecast` of `prediction_horizon` values around a base derived
/// from the inputs and `lookback_window`, with a fixed `forecast_confidence`.
pub fn lstm_sales_predictor(inputs: &ValueMap, params: &ValueMap) -> Result<Value, PluginError> {
  info!(model = LSTM_SALES_PREDICTOR_REF, inputs = ?inputs.keys().collect::<Vec<_>>(), "running model");
  let mut rng = rand::thread_rng();
  let lookback = param_usize(params, "lookback_window", 1) as f64;
  let horizon = param_usize(params, "prediction_horizon", 1);
  let input_len: usize = inputs.values().map(|v| v.to_string().len()).sum();
  let base = (input_len % 50) as f64 + 100.0 + lookback;
  let forecast: Vec<i64> = (0..horizon)
    .map(|i| (base + rng.gen_range(-10.0..10.0) * (i as f64 + 1.0)).round() as i64)
    .collect();
  warn!(confidence = LSTM_FIXED_CONFIDENCE, "reporting fixed low confidence");
  Ok(json!({
    "monthly_forecast": forecast,
    "forecast_confidence": LSTM_FIXED_CONFIDENCE,
  }))
}

/// Registers both demo forecasters.
pub fn register_demo_models(registry: &mut PluginRegistry) {
  registry.register(RANDOM_FORECASTER_REF, random_forecaster);
  registry.register(LSTM_SALES_PREDICTOR_REF, lstm_sales_predictor);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn demo_models_are_registered() {
    let mut reg = PluginRegistry::new();
    register_demo_models(&mut reg);
    assert!(reg.contains(RANDOM_FORECASTER_REF));
    assert!(reg.contains(LSTM_SALES_PREDICTOR_REF));
  }

  #[test]
  fn random_forecaster_honors_horizon() {
    let mut params = ValueMap::new();
    params.insert("prediction_horizon".to_string(), json!(5));
    let out = random_forecaster(&ValueMap::new(), &params).unwrap();
    assert_eq!(out["random_forecast"].as_array().unwrap().len(), 5);
    let c = out["prediction_confidence"].as_f64().unwrap();
    assert!((0.5..=0.99).contains(&c));
  }

  #[test]
  fn lstm_reports_fixed_confidence() {
    let mut params = ValueMap::new();
    params.insert("prediction_horizon".to_string(), json!(3));
    let out = lstm_sales_predictor(&ValueMap::new(), &params).unwrap();
    assert_eq!(out["monthly_forecast"].as_array().unwrap().len(), 3);
    assert_eq!(out["forecast_confidence"], json!(0.7));
  }
}
