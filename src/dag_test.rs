//! Tests for dependency graph construction and planning.

use crate::dag::DependencyGraph;
use crate::store::NodeStore;
use crate::test_support::node;
use proptest::prelude::*;
use std::collections::HashMap;

fn store(nodes: &[(&str, &[&str])]) -> NodeStore {
  NodeStore::from_nodes(
    std::path::Path::new("/nodes"),
    nodes.iter().map(|(id, deps)| node(id, deps)),
  )
}

#[test]
fn linear_chain_plans_in_dependency_order() {
  let s = store(&[("C", &["B"]), ("A", &[]), ("B", &["A"])]);
  let g = DependencyGraph::build(&s).unwrap();
  assert_eq!(g.plan().unwrap(), vec!["A", "B", "C"]);
}

#[test]
fn two_node_cycle_reports_both() {
  let s = store(&[("A", &["B"]), ("B", &["A"])]);
  let g = DependencyGraph::build(&s).unwrap();
  let err = g.plan().unwrap_err();
  assert_eq!(err.nodes, vec!["A", "B"]);
}

#[test]
fn cycle_report_excludes_nodes_that_were_placed() {
  let s = store(&[("root", &[]), ("x", &["root", "y"]), ("y", &["x"])]);
  let err = DependencyGraph::build(&s).unwrap().plan().unwrap_err();
  assert_eq!(err.nodes, vec!["x", "y"]);
}

#[test]
fn missing_dependency_is_reported_by_id() {
  let s = store(&[("A", &[]), ("B", &["ghost"])]);
  let err = DependencyGraph::build(&s).unwrap_err();
  assert_eq!(err.missing_refs(), vec!["ghost"]);
  assert_eq!(err.missing[0].node_id, "B");
}

#[test]
fn all_missing_dependencies_are_collected() {
  let s = store(&[("A", &["x"]), ("B", &["y", "A", ""])]);
  let err = DependencyGraph::build(&s).unwrap_err();
  assert_eq!(err.missing_refs(), vec!["x", "y", ""]);
  assert!(err.to_string().contains("<empty node_ref>"));
}

#[test]
fn ready_nodes_keep_fifo_discovery_order() {
  // root fans out to b then a; both become ready together.
  let s = store(&[
    ("root", &[]),
    ("b", &["root"]),
    ("a", &["root"]),
    ("solo", &[]),
  ]);
  let g = DependencyGraph::build(&s).unwrap();
  assert_eq!(g.plan().unwrap(), vec!["root", "solo", "b", "a"]);
}

#[test]
fn terminal_nodes_in_plan_order() {
  let s = store(&[("A", &[]), ("B", &["A"]), ("C", &["A"])]);
  let g = DependencyGraph::build(&s).unwrap();
  let plan = g.plan().unwrap();
  assert_eq!(g.terminal_nodes(&plan), vec!["B", "C"]);
  assert!(!g.is_terminal("A"));
  assert_eq!(g.dependents("A"), ["B".to_string(), "C".to_string()]);
  assert_eq!(g.in_degree("B"), Some(1));
  assert_eq!(g.in_degree("missing"), None);
}

proptest! {
  /// Random DAGs (edges only from lower to higher index) always plan every
  /// node, each after all of its dependencies.
  #[test]
  fn random_dags_plan_dependencies_first(
    n in 1usize..12,
    edges in proptest::collection::vec((0usize..12, 0usize..12), 0..30),
  ) {
    let ids: Vec<String> = (0..n).map(|i| format!("n{}", i)).collect();
    let mut deps: Vec<Vec<&str>> = vec![vec![]; n];
    for (a, b) in edges {
      let (a, b) = (a % n, b % n);
      if a < b && !deps[b].contains(&ids[a].as_str()) {
        deps[b].push(ids[a].as_str());
      }
    }
    // Reverse load order so the planner cannot rely on it.
    let s = NodeStore::from_nodes(
      std::path::Path::new("/nodes"),
      (0..n).rev().map(|i| node(&ids[i], &deps[i])),
    );
    let plan = DependencyGraph::build(&s).unwrap().plan().unwrap();
    prop_assert_eq!(plan.len(), n);
    let pos: HashMap<&str, usize> = plan.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
    for i in 0..n {
      for d in &deps[i] {
        prop_assert!(pos[d] < pos[ids[i].as_str()]);
      }
    }
  }
}
