//! Route finding and connectivity over a [`FloorGraph`].
//!
//! Edges are unweighted; the cost of a route is its hop count. Floors and
//! buildings need no special handling: a stairwell or elevator is an ordinary
//! node whose edges reach nodes on another level, so one breadth-first search
//! covers the whole site.

use crate::error::{MapError, Result};
use crate::graph::{FloorGraph, Level, NodeId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Shortest route from `start` to `end`, both included.
///
/// Returns `None` if either node is missing or they are not connected.
/// Callers are expected to show an explicit "no route" state in that case.
///
/// Among equally short routes the result is always the same one: neighbours
/// are expanded in ascending identity order.
pub fn find_route(graph: &FloorGraph, start: &str, end: &str) -> Option<Vec<NodeId>> {
    route(graph, start, end).ok()
}

/// Like [`find_route`] but says why no route was found.
///
/// # Errors
///
/// Returns [`MapError::NodeNotFound`] if an endpoint is missing and
/// [`MapError::NoPath`] if the endpoints are in different components.
pub fn route(graph: &FloorGraph, start: &str, end: &str) -> Result<Vec<NodeId>> {
    let start = &graph.get_node(start)?.id;
    let end = &graph.get_node(end)?.id;
    if start == end {
        return Ok(vec![start.clone()]);
    }

    let mut parents: HashMap<&NodeId, &NodeId> = HashMap::new();
    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut queue = VecDeque::new();

    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for neighbor in graph.adjacent(current) {
            if !visited.insert(neighbor) {
                continue;
            }
            parents.insert(neighbor, current);

            if neighbor == end {
                return Ok(walk_back(&parents, end));
            }
            queue.push_back(neighbor);
        }
    }

    Err(MapError::NoPath {
        start: start.to_string(),
        end: end.to_string(),
    })
}

fn walk_back(parents: &HashMap<&NodeId, &NodeId>, end: &NodeId) -> Vec<NodeId> {
    let mut path = vec![end.clone()];
    let mut cursor = end;
    while let Some(parent) = parents.get(cursor) {
        path.push((*parent).clone());
        cursor = *parent;
    }
    path.reverse();
    path
}

/// Breadth-first reachability from `start`.
///
/// Returns reachable identities in visiting order, excluding `start`.
/// `max_depth` limits the number of hops (`None` for unlimited).
///
/// # Errors
///
/// Returns [`MapError::NodeNotFound`] if `start` is missing.
pub fn reachable(graph: &FloorGraph, start: &str, max_depth: Option<usize>) -> Result<Vec<NodeId>> {
    let start = &graph.get_node(start)?.id;
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut result = Vec::new();

    visited.insert(start);
    queue.push_back((start, 0));

    while let Some((current, depth)) = queue.pop_front() {
        if max_depth.is_some_and(|max| depth >= max) {
            continue;
        }
        for neighbor in graph.adjacent(current) {
            if visited.insert(neighbor) {
                result.push(neighbor.clone());
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    Ok(result)
}

/// Partition the map into connected components.
///
/// Each component is sorted; components are ordered by their smallest
/// identity. A map meant for navigation should have exactly one.
pub fn connected_components(graph: &FloorGraph) -> Vec<Vec<NodeId>> {
    let mut seen: HashSet<&NodeId> = HashSet::new();
    let mut components = Vec::new();

    for node in graph.nodes() {
        if !seen.insert(&node.id) {
            continue;
        }
        let mut component = vec![node.id.clone()];
        let mut queue = VecDeque::from([&node.id]);
        while let Some(current) = queue.pop_front() {
            for neighbor in graph.adjacent(current) {
                if seen.insert(neighbor) {
                    component.push(neighbor.clone());
                    queue.push_back(neighbor);
                }
            }
        }
        component.sort();
        components.push(component);
    }

    components
}

/// One step of a route that moves to another building or floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelChange {
    /// Last node on the old level (the connector being left)
    pub from_node: NodeId,
    /// First node on the new level
    pub to_node: NodeId,
    /// Level being left
    pub from: Level,
    /// Level being entered
    pub to: Level,
}

/// Every consecutive pair in `path` whose nodes sit on different levels.
///
/// # Errors
///
/// Returns [`MapError::NodeNotFound`] if the path mentions a missing node.
pub fn level_changes(graph: &FloorGraph, path: &[NodeId]) -> Result<Vec<LevelChange>> {
    let mut changes = Vec::new();
    for pair in path.windows(2) {
        let here = graph.get_node(&pair[0])?;
        let next = graph.get_node(&pair[1])?;
        let (from, to) = (here.level(), next.level());
        if from != to {
            changes.push(LevelChange {
                from_node: here.id.clone(),
                to_node: next.id.clone(),
                from,
                to,
            });
        }
    }
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, Position};

    fn graph_with(nodes: &[&str], edges: &[(&str, &str)]) -> FloorGraph {
        let mut graph = FloorGraph::in_memory().unwrap();
        for (i, id) in nodes.iter().enumerate() {
            graph
                .insert_node(Node::new(*id, Position::new(i as f64, 0.0), "BLDG_A", 1))
                .unwrap();
        }
        for (a, b) in edges {
            graph.add_edge(a, b).unwrap();
        }
        graph
    }

    #[test]
    fn test_route_simple_chain() {
        let graph = graph_with(&["X", "Y", "Z"], &[("X", "Y"), ("Y", "Z")]);
        let path = find_route(&graph, "X", "Z").unwrap();
        assert_eq!(path, vec![NodeId::from("X"), NodeId::from("Y"), NodeId::from("Z")]);
        assert!(find_route(&graph, "X", "W").is_none());
    }

    #[test]
    fn test_route_prefers_smallest_identity_on_ties() {
        // Two equally short detours: via B and via C
        let graph = graph_with(
            &["A", "B", "C", "D"],
            &[("A", "C"), ("C", "D"), ("A", "B"), ("B", "D")],
        );
        let path = find_route(&graph, "A", "D").unwrap();
        assert_eq!(path[1].as_str(), "B");
    }

    #[test]
    fn test_route_reports_no_path() {
        let graph = graph_with(&["A", "B"], &[]);
        assert!(matches!(route(&graph, "A", "B"), Err(MapError::NoPath { .. })));
        assert!(matches!(
            route(&graph, "A", "missing"),
            Err(MapError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_reachable_with_depth() {
        let graph = graph_with(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("C", "D")]);
        assert_eq!(reachable(&graph, "A", Some(1)).unwrap().len(), 1);
        assert_eq!(reachable(&graph, "A", Some(2)).unwrap().len(), 2);
        assert_eq!(reachable(&graph, "A", None).unwrap().len(), 3);
    }

    #[test]
    fn test_connected_components() {
        let graph = graph_with(&["A", "B", "C", "D", "E"], &[("A", "B"), ("D", "C")]);
        let components = connected_components(&graph);
        assert_eq!(components.len(), 3);
        assert_eq!(components[0], vec![NodeId::from("A"), NodeId::from("B")]);
        assert_eq!(components[1], vec![NodeId::from("C"), NodeId::from("D")]);
        assert_eq!(components[2], vec![NodeId::from("E")]);
    }
}
