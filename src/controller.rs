//! Agent-supervised graph execution.
//!
//! [`AgentController`] walks the execution plan like the composer does, but
//! wraps every node in a pre-check and a post-check that may halt the run, and
//! hands each node that passes its post-check to the [`AdaptationManager`]. Everything it
//! notices is recorded twice: as `[DECISION]` / `[OBSERVATION]` lines in its
//! agent log and as `AGENT_DECISION` / `AGENT_OBSERVATION` trace events.

use std::path::PathBuf;

use serde_json::{Value, json};
use tracing::{debug, error, info, instrument, warn};

use crate::adaptation::AdaptationManager;
use crate::chance::{Chance, RandomChance};
use crate::composer::{Composition, resolve_inputs, terminal_results};
use crate::dag::{DependencyGraph, ExecutionPlan};
use crate::engine::ExecutionEngine;
use crate::node_io::{load_node, node_file_path};
use crate::session::Session;
use crate::store::NodeStore;
use crate::types::{
  ExecutionMetadata, Node, NodeResult, ResilienceAction, ResiliencePolicy, RiskLevel, RunOutcome,
  RunStatus, StructureEvaluation, ValueMap,
};

/// Post-check halts below this confidence unless a fallback policy exists.
pub const CONFIDENCE_THRESHOLD_LOW: f64 = 0.7;
/// Chance that a node with an adaptation strategy is preempted before running.
pub const PRE_CHECK_HALT_PROBABILITY: f64 = 0.1;
/// Chance that each Alert policy fires after a node runs.
pub const ALERT_PROBABILITY: f64 = 0.1;
/// Alert target when a policy names none.
pub const DEFAULT_ALERT_TARGET: &str = "monitoring_system";

enum Step {
  Continue,
  Halted,
  Failed,
}

pub struct AgentController<'a> {
  store: &'a NodeStore,
  graph: &'a DependencyGraph,
  plan: ExecutionPlan,
  adaptation: AdaptationManager,
  chance: Box<dyn Chance>,
  evaluation: Option<StructureEvaluation>,
  agent_log: Vec<String>,
  halted: bool,
}

impl<'a> AgentController<'a> {
  pub fn new(
    store: &'a NodeStore,
    graph: &'a DependencyGraph,
    plan: ExecutionPlan,
    adaptation: AdaptationManager,
  ) -> Self {
    Self {
      store,
      graph,
      plan,
      adaptation,
      chance: Box::new(RandomChance::from_entropy()),
      evaluation: None,
      agent_log: vec![],
      halted: false,
    }
  }

  pub fn from_composition(composition: &'a Composition, adaptation: AdaptationManager) -> Self {
    Self::new(
      &composition.store,
      &composition.graph,
      composition.plan.clone(),
      adaptation,
    )
  }

  /// Coin flips for pre-check preemption and simulated alerts.
  pub fn with_chance(mut self, chance: impl Chance + 'static) -> Self {
    self.chance = Box::new(chance);
    self
  }

  pub fn plan(&self) -> &[String] {
    &self.plan
  }

  pub fn evaluation(&self) -> Option<&StructureEvaluation> {
    self.evaluation.as_ref()
  }

  pub fn adaptation_manager(&self) -> &AdaptationManager {
    &self.adaptation
  }

  pub fn agent_log(&self) -> &[String] {
    &self.agent_log
  }

  fn decide(&mut self, session: &mut Session, message: String, data: Value, node_id: Option<&str>) {
    info!("[AGENT DECISION] {}", message);
    self.agent_log.push(format!("[DECISION] {}", message));
    session.log_event("AGENT_DECISION", with_message(message, data), node_id);
  }

  fn observe(&mut self, session: &mut Session, message: String, data: Value, node_id: Option<&str>) {
    debug!("[AGENT OBSERVATION] {}", message);
    self.agent_log.push(format!("[OBSERVATION] {}", message));
    session.log_event("AGENT_OBSERVATION", with_message(message, data), node_id);
  }

  /// Static assessment of the loaded nodes. Resets the agent log; repeated
  /// calls return the same evaluation.
  #[instrument(level = "trace", skip(self, session))]
  pub fn evaluate_structure(&mut self, session: &mut Session) -> StructureEvaluation {
    info!("evaluating graph structure");
    session.log_event("AGENT_EVAL_START", json!({}), None);
    self.agent_log.clear();
    let store = self.store;

    let node_count = store.len();
    self.observe(
      session,
      format!("Graph contains {} nodes.", node_count),
      json!({"count": node_count}),
      None,
    );

    let public: Vec<&str> = store
      .iter()
      .filter(|s| s.node.is_public())
      .map(|s| s.node.id.as_str())
      .collect();
    let risk = RiskLevel::from_public_count(public.len());
    match risk {
      RiskLevel::High => self.decide(
        session,
        format!(
          "High number ({}) of Public nodes detected: {}. Potential security review needed.",
          public.len(),
          public.join(", ")
        ),
        json!({"count": public.len(), "nodes": public, "risk_level": risk.to_string()}),
        None,
      ),
      RiskLevel::Medium => self.observe(
        session,
        format!("{} Public nodes detected: {}.", public.len(), public.join(", ")),
        json!({"count": public.len(), "nodes": public, "risk_level": risk.to_string()}),
        None,
      ),
      RiskLevel::Low => {}
    }

    let stateful: Vec<&str> = store
      .iter()
      .filter(|s| s.node.state_management.is_stateful())
      .map(|s| s.node.id.as_str())
      .collect();
    if !stateful.is_empty() {
      self.observe(
        session,
        format!(
          "{} stateful/contextual nodes detected: {}.",
          stateful.len(),
          stateful.join(", ")
        ),
        json!({"count": stateful.len(), "nodes": stateful}),
        None,
      );
    }

    let fallbacks: Vec<(&str, Value)> = store
      .iter()
      .flat_map(|s| {
        s.node
          .resilience_policy
          .iter()
          .filter(|p| p.action == ResilienceAction::Fallback)
          .map(move |p| {
            let target = p.action_params.get("node_ref").cloned().unwrap_or(Value::Null);
            (s.node.id.as_str(), target)
          })
      })
      .collect();
    if !fallbacks.is_empty() {
      self.observe(
        session,
        format!("{} Fallback resilience policies detected.", fallbacks.len()),
        json!({"count": fallbacks.len(), "details": fallbacks}),
        None,
      );
    }

    let adaptive: Vec<&str> = store
      .iter()
      .filter(|s| s.node.has_adaptation_strategy())
      .map(|s| s.node.id.as_str())
      .collect();
    if !adaptive.is_empty() {
      self.observe(
        session,
        format!(
          "{} nodes with adaptation strategies: {}",
          adaptive.len(),
          adaptive.join(", ")
        ),
        json!({"count": adaptive.len(), "nodes": adaptive}),
        None,
      );
    }

    let evaluation = StructureEvaluation {
      node_count,
      public_node_count: public.len(),
      security_risk_level: risk,
      stateful_node_count: stateful.len(),
      fallback_policy_count: fallbacks.len(),
      adaptation_nodes_count: adaptive.len(),
    };
    session.log_event(
      "AGENT_EVAL_END",
      json!({"evaluation_summary": serde_json::to_value(&evaluation).unwrap_or(Value::Null)}),
      None,
    );
    info!(?evaluation, "graph structure evaluated");
    self.evaluation = Some(evaluation.clone());
    evaluation
  }

  /// Executes the plan under agent control. Stops at the first failure
  /// (FAILED) or halt decision (HALTED); SUCCESS only when every planned node
  /// ran.
  #[instrument(level = "trace", skip(self, session))]
  pub fn run(&mut self, session: &mut Session) -> RunOutcome {
    if self.evaluation.is_none() {
      self.evaluate_structure(session);
    }
    info!(plan = ?self.plan, "starting graph execution with agent control");
    session.tracer.start_trace(json!({"plan_length": self.plan.len(), "plan": self.plan}));
    self.halted = false;

    let mut outcome = RunOutcome::new(RunStatus::Success);
    let plan = self.plan.clone();
    let total = plan.len();
    for (i, planned) in plan.iter().enumerate() {
      let substitute = outcome
        .adaptations
        .iter()
        .find(|(original, _)| original == planned)
        .map(|(_, new_id)| new_id.clone());
      let id = match substitute {
        Some(new_id) => {
          self.observe(
            session,
            format!(
              "Node {} was adapted earlier in this run. Using new version: {}",
              planned, new_id
            ),
            json!({}),
            Some(&new_id),
          );
          new_id
        }
        None => planned.clone(),
      };

      info!(step = i + 1, total, node_id = %id, "agent considering node");
      session.log_event(
        "AGENT_STEP_START",
        json!({"step": i + 1, "total_steps": total}),
        Some(&id),
      );
      match self.step(&id, &mut outcome, session) {
        Step::Continue => {}
        Step::Halted => {
          outcome.status = RunStatus::Halted;
          break;
        }
        Step::Failed => {
          outcome.status = RunStatus::Failed;
          break;
        }
      }
    }

    outcome.final_results = terminal_results(self.graph, &self.plan, &outcome.results);
    outcome.agent_log = self.agent_log.clone();
    session
      .tracer
      .end_trace(&outcome.status.to_string(), outcome.final_results_json());
    match outcome.status {
      RunStatus::Success => info!("graph execution with agent control completed successfully"),
      RunStatus::Halted => warn!("graph execution halted by agent"),
      RunStatus::Failed => error!("graph execution with agent control failed"),
    }
    outcome
  }

  fn step(&mut self, id: &str, outcome: &mut RunOutcome, session: &mut Session) -> Step {
    let Some((node, path)) = self.locate(id) else {
      error!(node_id = %id, "node file not found");
      self.decide(
        session,
        format!("Node file not found for {}. Halting graph.", id),
        json!({"reason": "Node file missing"}),
        Some(id),
      );
      outcome
        .results
        .insert(id.to_string(), NodeResult::error("Node file missing"));
      return Step::Failed;
    };

    self.pre_check(&node, session);
    if self.halted {
      self.decide(
        session,
        format!("Execution halted by agent during pre-check for node {}.", id),
        json!({"reason": "Agent pre-check decision"}),
        Some(id),
      );
      session.log_event(
        "EXECUTION_HALTED",
        json!({"reason": "Agent pre-check decision", "node_id": id}),
        None,
      );
      return Step::Halted;
    }

    info!(node_id = %id, "agent approves execution");
    session.log_event("AGENT_APPROVAL", json!({"action": "EXECUTE"}), Some(id));

    let inputs = match resolve_inputs(&node, &outcome.results) {
      Ok(inputs) => inputs,
      Err(e) => {
        session.log_event(
          "NODE_ERROR",
          json!({"error": "Missing required inputs from dependencies", "detail": e.to_string()}),
          Some(id),
        );
        self.decide(
          session,
          format!("Node {} is missing inputs from its dependencies. Halting graph.", id),
          json!({"reason": "Missing inputs", "error": e.to_string()}),
          Some(id),
        );
        outcome.results.insert(id.to_string(), NodeResult::error(e.to_string()));
        return Step::Failed;
      }
    };

    let mut engine = ExecutionEngine::new(path);
    if !engine.load_and_validate(session) {
      error!(node_id = %id, "loading or validation failed");
      self.decide(
        session,
        format!("Load/Validation failed for {}. Halting graph.", id),
        json!({"reason": "Load/Validation Failed"}),
        Some(id),
      );
      outcome
        .results
        .insert(id.to_string(), NodeResult::error("Load/Validation failed"));
      return Step::Failed;
    }

    let ok = engine.execute(inputs, session);
    let result = engine
      .result()
      .cloned()
      .unwrap_or_else(|| NodeResult::error("Execution produced no result"));
    let metadata = engine.metadata().clone();
    outcome.results.insert(id.to_string(), result.clone());
    outcome.metadata.insert(id.to_string(), metadata.clone());
    if !ok {
      error!(node_id = %id, "execution failed");
      self.decide(
        session,
        format!("Node {} failed execution. Halting graph.", id),
        json!({"error": result}),
        Some(id),
      );
      return Step::Failed;
    }
    info!(node_id = %id, "node finished successfully");

    self.post_check(&node, &metadata, session);
    if self.halted {
      self.decide(
        session,
        format!("Execution halted by agent after node {} completed.", id),
        json!({"reason": "Agent post-check decision"}),
        Some(id),
      );
      session.log_event(
        "EXECUTION_HALTED",
        json!({"reason": "Agent post-check decision", "node_id": id}),
        None,
      );
      return Step::Halted;
    }
    self.adapt(&node, &metadata, outcome, session);
    Step::Continue
  }

  /// The stored node, or for ids created by adaptation during this run, the
  /// node file next to the others.
  fn locate(&self, id: &str) -> Option<(Node, PathBuf)> {
    if let (Some(node), Some(path)) = (self.store.get(id), self.store.path_of(id)) {
      return Some((node.clone(), path.to_path_buf()));
    }
    let path = node_file_path(self.store.dir(), id);
    match load_node(&path) {
      Ok(node) => Some((node, path)),
      Err(e) => {
        warn!(node_id = %id, error = %e, "cannot load node");
        None
      }
    }
  }

  /// Observes security and state metadata without enforcing it. A node with an
  /// adaptation strategy may be preempted for review.
  fn pre_check(&mut self, node: &Node, session: &mut Session) {
    let id = node.id.as_str();
    self.observe(
      session,
      format!("Performing pre-execution checks for node {}.", id),
      json!({"event": "PRE_CHECK_START"}),
      Some(id),
    );

    let access_level = &node.security_policy.access_level;
    if access_level == "Private" {
      self.observe(
        session,
        format!("Node {} has access level: Private. Proceeding without enforcement.", id),
        json!({"access_level": access_level}),
        Some(id),
      );
    }

    let state = &node.state_management;
    if state.is_stateful() {
      self.observe(
        session,
        format!(
          "Node {} requires state/context from {}. Assuming available.",
          id,
          state.memory_ref.as_deref().unwrap_or("an unnamed store")
        ),
        json!({"state_type": state.kind, "memory_ref": state.memory_ref}),
        Some(id),
      );
    }

    if let Some(strategy) = &node.adaptation_strategy {
      if self.chance.happens(PRE_CHECK_HALT_PROBABILITY) {
        let (trigger, method) = (strategy.trigger.as_str(), strategy.method.as_str());
        self.decide(
          session,
          format!(
            "Adaptation strategy trigger simulated for node {} (Trigger: {}, Method: {}). Halting execution for review.",
            id, trigger, method
          ),
          json!({"trigger": trigger, "method": method}),
          Some(id),
        );
        self.halted = true;
      }
    }

    session.log_event(
      "AGENT_PRE_CHECK_END",
      json!({"halt_decision": self.halted}),
      Some(id),
    );
  }

  /// Low confidence halts unless a confidence-related Fallback policy exists.
  /// Alert policies may fire a simulated alert.
  fn post_check(&mut self, node: &Node, metadata: &ExecutionMetadata, session: &mut Session) {
    let id = node.id.as_str();
    self.observe(
      session,
      format!("Performing post-execution checks for node {}.", id),
      json!({"event": "POST_CHECK_START"}),
      Some(id),
    );

    if let Some(confidence) = metadata.simulated_confidence {
      self.observe(
        session,
        format!("Node {} reported confidence: {:.3}", id, confidence),
        json!({"confidence": confidence}),
        Some(id),
      );
      if confidence < CONFIDENCE_THRESHOLD_LOW {
        self.decide(
          session,
          format!(
            "Confidence ({:.3}) for node {} is below threshold ({}).",
            confidence, id, CONFIDENCE_THRESHOLD_LOW
          ),
          json!({"confidence": confidence, "threshold": CONFIDENCE_THRESHOLD_LOW}),
          Some(id),
        );
        match confidence_fallback(node) {
          Some(policy) => {
            let target = policy.action_params.get("node_ref").cloned().unwrap_or(Value::Null);
            self.decide(
              session,
              format!(
                "Resilience policy allows Fallback to '{}'. Suggesting fallback without executing it.",
                target.as_str().unwrap_or("unspecified")
              ),
              json!({"fallback_node": target, "condition": policy.condition}),
              Some(id),
            );
          }
          None => {
            self.decide(
              session,
              "No applicable Fallback policy found. Suggesting halt for human review.".to_string(),
              json!({"reason": "Low confidence, no fallback"}),
              Some(id),
            );
            self.halted = true;
          }
        }
      }
    }

    for policy in node
      .resilience_policy
      .iter()
      .filter(|p| p.action == ResilienceAction::Alert)
    {
      if self.chance.happens(ALERT_PROBABILITY) {
        let target = policy
          .action_params
          .get("target_agent")
          .and_then(Value::as_str)
          .unwrap_or(DEFAULT_ALERT_TARGET);
        self.observe(
          session,
          format!(
            "Simulating resilience alert for node {}: condition '{}' met. Alert target: {}",
            id, policy.condition, target
          ),
          json!({"condition": policy.condition, "alert_target": target}),
          Some(id),
        );
      }
    }

    session.log_event(
      "AGENT_POST_CHECK_END",
      json!({"halt_decision": self.halted}),
      Some(id),
    );
  }

  fn adapt(
    &mut self,
    node: &Node,
    metadata: &ExecutionMetadata,
    outcome: &mut RunOutcome,
    session: &mut Session,
  ) {
    let Some(triggered) = self.adaptation.check_trigger(node, metadata) else {
      return;
    };
    match self.adaptation.perform(node, &triggered) {
      Ok(new_id) => {
        self.observe(
          session,
          format!("Node {} was adapted to {}.", node.id, new_id),
          json!({"original_id": node.id, "new_id": new_id}),
          Some(&node.id),
        );
        outcome.adaptations.push((node.id.clone(), new_id));
      }
      Err(e) => {
        let already_adapted = e.is_already_adapted();
        if already_adapted {
          warn!(node_id = %node.id, error = %e, "node already adapted, existing file kept");
        } else {
          error!(node_id = %node.id, error = %e, "adaptation failed");
        }
        session.log_event(
          "ADAPTATION_ERROR",
          json!({"error": e.to_string(), "already_adapted": already_adapted}),
          Some(&node.id),
        );
      }
    }
  }

  /// Review suggestions drawn from a finished run's metadata.
  pub fn suggest_optimizations(&mut self, outcome: &RunOutcome, session: &mut Session) -> Vec<String> {
    info!("analyzing run for optimizations");
    session.log_event("AGENT_OPTIMIZATION_START", json!({}), None);

    let low: Vec<&str> = outcome
      .metadata
      .iter()
      .filter(|(_, md)| {
        md.simulated_confidence
          .is_some_and(|c| c < CONFIDENCE_THRESHOLD_LOW)
      })
      .map(|(id, _)| id.as_str())
      .collect();

    let suggestion = if low.len() > 1 {
      let s = format!(
        "Multiple nodes ({}) consistently show low confidence (<{}). Consider reviewing their models or resilience policies.",
        low.join(", "),
        CONFIDENCE_THRESHOLD_LOW
      );
      self.observe(
        session,
        s.clone(),
        json!({"type": "low_confidence", "nodes": low, "threshold": CONFIDENCE_THRESHOLD_LOW}),
        None,
      );
      s
    } else {
      let s = "No obvious optimization suggestions based on current rules and run data.".to_string();
      self.observe(session, s.clone(), json!({"type": "no_suggestions"}), None);
      s
    };
    let suggestions = vec![suggestion];

    session.log_event(
      "AGENT_OPTIMIZATION_END",
      json!({"suggestions_count": suggestions.len(), "suggestions": suggestions}),
      None,
    );
    suggestions
  }
}

impl std::fmt::Debug for AgentController<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AgentController")
      .field("plan", &self.plan)
      .field("adaptation", &self.adaptation)
      .field("evaluation", &self.evaluation)
      .field("halted", &self.halted)
      .finish_non_exhaustive()
  }
}

/// First Fallback policy whose condition mentions confidence.
fn confidence_fallback(node: &Node) -> Option<&ResiliencePolicy> {
  node.resilience_policy.iter().find(|p| {
    p.action == ResilienceAction::Fallback && p.condition.to_lowercase().contains("confidence")
  })
}

fn with_message(message: String, data: Value) -> Value {
  let mut map = ValueMap::new();
  map.insert("message".to_string(), Value::String(message));
  if let Value::Object(extra) = data {
    map.extend(extra);
  }
  Value::Object(map)
}
