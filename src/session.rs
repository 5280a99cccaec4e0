//! Per-run context threaded through the engine, composer and controller.

use rand::RngCore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

use crate::error::ValidationError;
use crate::plugins::PluginRegistry;
use crate::schema::{NodeValidator, SchemaValidator};
use crate::simulation::{self, SimulationProfile};
use crate::tracer::Tracer;
use crate::types::{InputSpec, OutputSpec, ValueMap};

/// Trace handle, plugin registry, validator, simulation profile and random
/// source for one run.
pub struct Session {
  pub tracer: Tracer,
  pub plugins: PluginRegistry,
  pub simulation: SimulationProfile,
  validator: Box<dyn NodeValidator>,
  rng: Box<dyn RngCore>,
}

impl Session {
  /// Session validating against the bundled node schema, with no plugins.
  pub fn new(tracer: Tracer) -> Result<Self, ValidationError> {
    Ok(Self::with_validator_boxed(
      tracer,
      Box::new(SchemaValidator::node_schema()?),
    ))
  }

  fn with_validator_boxed(tracer: Tracer, validator: Box<dyn NodeValidator>) -> Self {
    Self {
      tracer,
      plugins: PluginRegistry::new(),
      simulation: SimulationProfile::default(),
      validator,
      rng: Box::new(StdRng::from_entropy()),
    }
  }

  pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
    self.plugins = plugins;
    self
  }

  pub fn with_validator(mut self, validator: impl NodeValidator + 'static) -> Self {
    self.validator = Box::new(validator);
    self
  }

  pub fn with_rng(mut self, rng: impl RngCore + 'static) -> Self {
    self.rng = Box::new(rng);
    self
  }

  pub fn with_simulation(mut self, profile: SimulationProfile) -> Self {
    self.simulation = profile;
    self
  }

  pub fn validator(&self) -> &dyn NodeValidator {
    self.validator.as_ref()
  }

  pub fn rng(&mut self) -> &mut dyn RngCore {
    self.rng.as_mut()
  }

  /// Shorthand for `self.tracer.log_event`.
  pub fn log_event(&mut self, event_type: &str, data: Value, node_id: Option<&str>) {
    self.tracer.log_event(event_type, data, node_id);
  }

  pub(crate) fn mock_inputs(&mut self, inputs: &[InputSpec]) -> ValueMap {
    simulation::mock_inputs(inputs, self.rng.as_mut())
  }

  pub(crate) fn simulate(
    &mut self,
    kind: &str,
    reference: &str,
    params: &ValueMap,
    outputs: &[OutputSpec],
  ) -> ValueMap {
    simulation::simulate_outputs(
      kind,
      reference,
      params,
      outputs,
      &self.simulation,
      self.rng.as_mut(),
    )
  }
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("tracer", &self.tracer)
      .field("plugins", &self.plugins)
      .field("simulation", &self.simulation)
      .finish_non_exhaustive()
  }
}
