use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use fresco_config::WorkflowDef;

use crate::error::ValidationError;

/// Validate a workflow definition without touching any external state.
///
/// Checks run in order: node id uniqueness, reference integrity (explicit
/// dependencies and connection endpoints, including port declarations),
/// then acyclicity. The first violation is returned.
pub fn validate(def: &WorkflowDef) -> Result<(), ValidationError> {
  check_unique_ids(def)?;
  check_references(def)?;
  topological_order(def)?;
  Ok(())
}

/// The deduplicated dependency edge set of a definition.
///
/// An edge `(from, to)` exists when `to` lists `from` in `depends_on`, or a
/// connection carries data from `from` to `to`. A pair related both ways
/// yields a single edge.
pub(crate) fn dependency_edges(def: &WorkflowDef) -> Vec<(String, String)> {
  let mut edges: BTreeSet<(String, String)> = BTreeSet::new();

  for fragment in &def.fragments {
    for dep in &fragment.depends_on {
      edges.insert((dep.clone(), fragment.id.clone()));
    }
  }

  for connection in &def.connections {
    edges.insert((
      connection.source.node_id.clone(),
      connection.target.node_id.clone(),
    ));
  }

  edges.into_iter().collect()
}

/// Compute a topological order over the definition's dependency edges.
///
/// Ties are broken by node id so the order is stable for a given
/// definition. Returns `CyclicGraph` naming the unresolvable nodes when no
/// complete order exists.
pub(crate) fn topological_order(def: &WorkflowDef) -> Result<Vec<String>, ValidationError> {
  let edges = dependency_edges(def);

  let mut in_degree: HashMap<&str, usize> = def
    .fragments
    .iter()
    .map(|f| (f.id.as_str(), 0))
    .collect();
  let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

  for (from, to) in &edges {
    adjacency.entry(from.as_str()).or_default().push(to.as_str());
    if let Some(degree) = in_degree.get_mut(to.as_str()) {
      *degree += 1;
    }
  }

  let mut ready: Vec<&str> = in_degree
    .iter()
    .filter(|(_, degree)| **degree == 0)
    .map(|(id, _)| *id)
    .collect();
  ready.sort_unstable();

  let mut queue: VecDeque<&str> = ready.into_iter().collect();
  let mut order = Vec::with_capacity(def.fragments.len());

  while let Some(current) = queue.pop_front() {
    order.push(current.to_string());
    if let Some(downstream) = adjacency.get(current) {
      for next in downstream {
        if let Some(degree) = in_degree.get_mut(next) {
          *degree -= 1;
          if *degree == 0 {
            queue.push_back(next);
          }
        }
      }
    }
  }

  if order.len() != def.fragments.len() {
    let settled: HashSet<&str> = order.iter().map(|s| s.as_str()).collect();
    let mut nodes: Vec<String> = def
      .fragments
      .iter()
      .filter(|f| !settled.contains(f.id.as_str()))
      .map(|f| f.id.clone())
      .collect();
    nodes.sort_unstable();
    return Err(ValidationError::CyclicGraph { nodes });
  }

  Ok(order)
}

fn check_unique_ids(def: &WorkflowDef) -> Result<(), ValidationError> {
  let mut seen = HashSet::new();
  for fragment in &def.fragments {
    if !seen.insert(fragment.id.as_str()) {
      return Err(ValidationError::DuplicateNode {
        node_id: fragment.id.clone(),
      });
    }
  }
  Ok(())
}

fn check_references(def: &WorkflowDef) -> Result<(), ValidationError> {
  let fragments: HashMap<&str, &fresco_config::FragmentDef> =
    def.fragments.iter().map(|f| (f.id.as_str(), f)).collect();

  for fragment in &def.fragments {
    for dep in &fragment.depends_on {
      if !fragments.contains_key(dep.as_str()) {
        return Err(ValidationError::UnknownNode {
          node_id: dep.clone(),
          referenced_by: format!("node '{}'", fragment.id),
        });
      }
    }
  }

  for connection in &def.connections {
    let source = fragments.get(connection.source.node_id.as_str()).ok_or_else(|| {
      ValidationError::UnknownNode {
        node_id: connection.source.node_id.clone(),
        referenced_by: format!("connection '{}'", connection.id),
      }
    })?;
    let target = fragments.get(connection.target.node_id.as_str()).ok_or_else(|| {
      ValidationError::UnknownNode {
        node_id: connection.target.node_id.clone(),
        referenced_by: format!("connection '{}'", connection.id),
      }
    })?;

    if !source
      .output_ports()
      .contains(&connection.source.port_id.as_str())
    {
      return Err(ValidationError::UnknownPort {
        node_id: source.id.clone(),
        port_id: connection.source.port_id.clone(),
        connection_id: connection.id.clone(),
      });
    }
    if !target
      .input_ports()
      .contains(&connection.target.port_id.as_str())
    {
      return Err(ValidationError::UnknownPort {
        node_id: target.id.clone(),
        port_id: connection.target.port_id.clone(),
        connection_id: connection.id.clone(),
      });
    }
  }

  Ok(())
}
