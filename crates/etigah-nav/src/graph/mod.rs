//! Indoor map graph types and operations.
//!
//! This module defines the fundamental building blocks:
//! - [`Node`]: a point of interest or junction with a position and level
//! - [`Edge`]: an undirected navigable connection between two nodes
//! - [`FloorGraph`]: the graph store with its invariants and persistence
//! - [`algorithms`]: route finding and connectivity

pub mod algorithms;
mod floor_graph;
mod types;

pub use floor_graph::FloorGraph;
pub use types::{Edge, EdgeKey, Level, Node, NodeId, Position};
