//! Dependency graph over loaded nodes and its topological execution plan.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, error, info, instrument};

use crate::error::{CycleError, DependencyError, MissingDependency};
use crate::store::NodeStore;

/// Linear execution order of node ids.
pub type ExecutionPlan = Vec<String>;

/// Adjacency (`dependency -> dependents`) and in-degree per node.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
  /// Node ids in store load order; seeds the planner's queue.
  order: Vec<String>,
  adj: HashMap<String, Vec<String>>,
  in_degree: HashMap<String, usize>,
}

impl DependencyGraph {
  /// Adds an edge `dep -> node` for every declared dependency. Every missing
  /// reference is collected before failing.
  #[instrument(level = "trace", skip(store))]
  pub fn build(store: &NodeStore) -> Result<Self, DependencyError> {
    info!("building dependency graph");
    let order: Vec<String> = store.ids().map(String::from).collect();
    let mut adj: HashMap<String, Vec<String>> = HashMap::new();
    let mut in_degree: HashMap<String, usize> = order.iter().map(|id| (id.clone(), 0)).collect();
    let mut missing = vec![];

    for stored in store.iter() {
      let node_id = &stored.node.id;
      for dep in &stored.node.depends_on {
        if dep.node_ref.is_empty() || !store.contains(&dep.node_ref) {
          error!(node_id = %node_id, missing_ref = %dep.node_ref, "dependency does not resolve");
          missing.push(MissingDependency {
            node_id: node_id.clone(),
            missing_ref: dep.node_ref.clone(),
          });
          continue;
        }
        adj
          .entry(dep.node_ref.clone())
          .or_default()
          .push(node_id.clone());
        *in_degree.entry(node_id.clone()).or_insert(0) += 1;
        debug!(from = %dep.node_ref, to = %node_id, "added dependency edge");
      }
    }

    if !missing.is_empty() {
      return Err(DependencyError { missing });
    }
    Ok(Self {
      order,
      adj,
      in_degree,
    })
  }

  /// Kahn's algorithm. Equally-ready nodes run in FIFO discovery order, seeded
  /// by load order.
  #[instrument(level = "trace", skip(self))]
  pub fn plan(&self) -> Result<ExecutionPlan, CycleError> {
    let mut remaining = self.in_degree.clone();
    let mut queue: VecDeque<&str> = self
      .order
      .iter()
      .filter(|id| remaining.get(id.as_str()).copied().unwrap_or(0) == 0)
      .map(String::as_str)
      .collect();
    let mut plan = Vec::with_capacity(self.order.len());

    while let Some(u) = queue.pop_front() {
      plan.push(u.to_string());
      for v in self.dependents(u) {
        if let Some(d) = remaining.get_mut(v) {
          *d -= 1;
          if *d == 0 {
            queue.push_back(v);
          }
        }
      }
    }

    if plan.len() < self.order.len() {
      let nodes: Vec<String> = self
        .order
        .iter()
        .filter(|id| remaining.get(id.as_str()).copied().unwrap_or(0) > 0)
        .cloned()
        .collect();
      error!(nodes = ?nodes, "cycle detected, no linear plan");
      return Err(CycleError { nodes });
    }
    info!(plan = ?plan, "execution plan generated");
    Ok(plan)
  }

  /// Nodes that declared `id` as a dependency, in declaration order.
  pub fn dependents(&self, id: &str) -> &[String] {
    self.adj.get(id).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn in_degree(&self, id: &str) -> Option<usize> {
    self.in_degree.get(id).copied()
  }

  /// A node nothing depends on.
  pub fn is_terminal(&self, id: &str) -> bool {
    self.dependents(id).is_empty()
  }

  /// Terminal nodes of `plan`, in plan order.
  pub fn terminal_nodes<'a>(&self, plan: &'a [String]) -> Vec<&'a str> {
    plan
      .iter()
      .filter(|id| self.is_terminal(id))
      .map(String::as_str)
      .collect()
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }
}
