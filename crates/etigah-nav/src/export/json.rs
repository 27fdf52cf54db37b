//! JSON snapshot format.
//!
//! ```json
//! {
//!   "nodes": [{"id": "lobby", "x": 40.0, "y": 60.0, "building": "BLDG_A", "floor": 1}],
//!   "edges": [{"from": "lobby", "to": "stairs"}]
//! }
//! ```

use crate::error::{MapError, Result};
use crate::graph::{Edge, FloorGraph, Node};
use serde::{Deserialize, Serialize};

/// Full content of a [`FloorGraph`], in identity order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// All nodes
    pub nodes: Vec<Node>,
    /// All edges
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Export the graph as pretty-printed snapshot JSON.
pub fn export_json(graph: &FloorGraph) -> Result<String> {
    serde_json::to_string_pretty(&graph.snapshot())
        .map_err(|e| MapError::serialization("Failed to serialize snapshot", Some(e)))
}

/// Parse snapshot JSON.
///
/// Only the shape is checked here; graph invariants are checked by
/// [`FloorGraph::restore`].
pub fn import_json(text: &str) -> Result<GraphSnapshot> {
    serde_json::from_str(text)
        .map_err(|e| MapError::serialization("Failed to parse snapshot", Some(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Position;

    #[test]
    fn test_export_shape() {
        let mut graph = FloorGraph::in_memory().unwrap();
        let a = graph.add_node(Position::new(1.0, 2.0), "BLDG_A", 1).unwrap();
        let b = graph.add_node(Position::new(3.0, 4.0), "BLDG_A", 2).unwrap();
        graph.add_edge(&a, &b).unwrap();

        let json: serde_json::Value = serde_json::from_str(&export_json(&graph).unwrap()).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(json["nodes"][0]["id"], "node-0");
        assert_eq!(json["nodes"][1]["floor"], 2);
        assert_eq!(json["edges"][0]["from"], "node-0");
        assert_eq!(json["edges"][0]["to"], "node-1");
    }

    #[test]
    fn test_import_without_edges() {
        let snapshot = import_json(
            r#"{"nodes":[{"id":"lobby","x":0,"y":0,"building":"BLDG_A","floor":1}]}"#,
        )
        .unwrap();
        assert_eq!(snapshot.nodes.len(), 1);
        assert!(snapshot.edges.is_empty());
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(matches!(
            import_json("{\"nodes\": 3}"),
            Err(MapError::Serialization { .. })
        ));
    }
}
