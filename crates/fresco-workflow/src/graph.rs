use std::collections::{HashMap, HashSet, VecDeque};

use crate::workflow::FragmentNode;

/// Graph structure for traversal and analysis.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: node_id -> list of downstream node_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: node_id -> list of upstream node_ids.
  reverse_adjacency: HashMap<String, Vec<String>>,
  /// Nodes with no incoming edges.
  entry_points: Vec<String>,
}

impl Graph {
  /// Build a graph from nodes and dependency edges.
  pub fn new(nodes: &HashMap<String, FragmentNode>, edges: &[(String, String)]) -> Self {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for node_id in nodes.keys() {
      adjacency.entry(node_id.clone()).or_default();
      reverse_adjacency.entry(node_id.clone()).or_default();
    }

    for (from, to) in edges {
      adjacency.entry(from.clone()).or_default().push(to.clone());
      reverse_adjacency
        .entry(to.clone())
        .or_default()
        .push(from.clone());
    }

    let entry_points: Vec<String> = nodes
      .keys()
      .filter(|id| reverse_adjacency.get(*id).is_none_or(|v| v.is_empty()))
      .cloned()
      .collect();

    Self {
      adjacency,
      reverse_adjacency,
      entry_points,
    }
  }

  /// Get entry points (nodes with no incoming edges).
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  /// Get direct downstream nodes for a given node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get direct upstream nodes for a given node.
  pub fn upstream(&self, node_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// All nodes transitively reachable from `node_id`, excluding itself.
  ///
  /// This is the set affected by failure containment: when a node fails,
  /// its downstream closure is settled as skipped.
  pub fn downstream_closure(&self, node_id: &str) -> HashSet<String> {
    let mut closure = HashSet::new();
    let mut queue: VecDeque<&str> = self.downstream(node_id).iter().map(|s| s.as_str()).collect();

    while let Some(current) = queue.pop_front() {
      if closure.insert(current.to_string()) {
        for next in self.downstream(current) {
          queue.push_back(next);
        }
      }
    }

    closure
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use fresco_config::FragmentType;

  fn node(id: &str) -> FragmentNode {
    FragmentNode {
      id: id.to_string(),
      fragment_type: FragmentType::DataTransform,
      name: id.to_string(),
      config: serde_json::Map::new(),
      timeout_ms: None,
    }
  }

  fn diamond() -> Graph {
    let nodes: HashMap<String, FragmentNode> = ["a", "b", "c", "d"]
      .iter()
      .map(|id| (id.to_string(), node(id)))
      .collect();
    let edges = vec![
      ("a".to_string(), "b".to_string()),
      ("a".to_string(), "c".to_string()),
      ("b".to_string(), "d".to_string()),
      ("c".to_string(), "d".to_string()),
    ];
    Graph::new(&nodes, &edges)
  }

  #[test]
  fn test_entry_points_and_neighbors() {
    let graph = diamond();

    assert_eq!(graph.entry_points(), ["a".to_string()]);
    let mut downstream = graph.downstream("a").to_vec();
    downstream.sort();
    assert_eq!(downstream, ["b", "c"]);
    let mut upstream = graph.upstream("d").to_vec();
    upstream.sort();
    assert_eq!(upstream, ["b", "c"]);
    assert!(graph.upstream("a").is_empty());
  }

  #[test]
  fn test_downstream_closure() {
    let graph = diamond();

    let closure = graph.downstream_closure("a");
    assert_eq!(closure.len(), 3);
    assert!(closure.contains("b"));
    assert!(closure.contains("c"));
    assert!(closure.contains("d"));

    let closure = graph.downstream_closure("b");
    assert_eq!(closure.len(), 1);
    assert!(closure.contains("d"));

    assert!(graph.downstream_closure("d").is_empty());
  }
}
