//! Adaptation trigger evaluation.

use serde_json::{Value, json};

use crate::chance::{Chance, RandomChance};
use crate::types::{AdaptationStrategy, AdaptationTrigger, ExecutionMetadata};

/// Performance_Degradation fires below this confidence.
pub const CONFIDENCE_THRESHOLD: f64 = 0.75;
/// Performance_Degradation fires above this duration when confidence is fine.
pub const EXECUTION_TIME_THRESHOLD_MS: f64 = 1000.0;
/// Per-evaluation probability standing in for a real feedback signal.
pub const EXTERNAL_FEEDBACK_PROBABILITY: f64 = 0.05;
/// Per-evaluation probability standing in for an elapsed-time check.
pub const SCHEDULED_REVIEW_PROBABILITY: f64 = 0.02;

/// Why a trigger fired: a short condition name plus structured details.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerFiring {
  pub condition: String,
  pub details: Value,
}

impl TriggerFiring {
  pub fn new(condition: impl Into<String>, details: Value) -> Self {
    Self {
      condition: condition.into(),
      details,
    }
  }
}

/// Decides whether a node's adaptation strategy fires for one execution.
pub trait TriggerPolicy {
  fn evaluate(
    &mut self,
    strategy: &AdaptationStrategy,
    metadata: &ExecutionMetadata,
  ) -> Option<TriggerFiring>;
}

/// Threshold checks for Performance_Degradation, coin flips for
/// External_Feedback and Scheduled_Review. Manual and unknown triggers never
/// fire on their own.
pub struct StandardTriggers {
  chance: Box<dyn Chance>,
}

impl StandardTriggers {
  pub fn new(chance: impl Chance + 'static) -> Self {
    Self {
      chance: Box::new(chance),
    }
  }
}

impl Default for StandardTriggers {
  fn default() -> Self {
    Self::new(RandomChance::from_entropy())
  }
}

impl TriggerPolicy for StandardTriggers {
  fn evaluate(
    &mut self,
    strategy: &AdaptationStrategy,
    metadata: &ExecutionMetadata,
  ) -> Option<TriggerFiring> {
    match &strategy.trigger {
      AdaptationTrigger::PerformanceDegradation => {
        if let Some(confidence) = metadata.simulated_confidence {
          if confidence < CONFIDENCE_THRESHOLD {
            return Some(TriggerFiring::new(
              "Low Confidence",
              json!({"confidence": confidence, "threshold": CONFIDENCE_THRESHOLD}),
            ));
          }
        }
        (metadata.execution_duration_ms > EXECUTION_TIME_THRESHOLD_MS).then(|| {
          TriggerFiring::new(
            "High Execution Time",
            json!({
              "execution_time_ms": metadata.execution_duration_ms,
              "threshold_ms": EXECUTION_TIME_THRESHOLD_MS,
            }),
          )
        })
      }
      AdaptationTrigger::ExternalFeedback => self
        .chance
        .happens(EXTERNAL_FEEDBACK_PROBABILITY)
        .then(|| {
          TriggerFiring::new(
            "Simulated External Feedback",
            json!({"feedback_source": "simulated_monitor"}),
          )
        }),
      AdaptationTrigger::ScheduledReview => self
        .chance
        .happens(SCHEDULED_REVIEW_PROBABILITY)
        .then(|| {
          TriggerFiring::new(
            "Simulated Scheduled Review Due",
            json!({"reason": "Simulated time elapsed"}),
          )
        }),
      AdaptationTrigger::ManualTrigger | AdaptationTrigger::Other(_) => None,
    }
  }
}

impl std::fmt::Debug for StandardTriggers {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StandardTriggers").finish_non_exhaustive()
  }
}
