//! Core map types: node identities, positions, nodes, edges and levels.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::{Add, Sub};

/// Opaque node identity, unique within a [`FloorGraph`](super::FloorGraph).
///
/// Identities order lexicographically; the routing engine relies on this
/// order for deterministic tie-breaking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the identity string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for NodeId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// A 2-D point in editor-canvas units (or map percentages).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite (no NaN or infinity).
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A `(building, floor)` pair. Floors are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Level {
    /// Building identifier
    pub building: String,
    /// Floor number (>= 1)
    pub floor: u32,
}

impl Level {
    /// Create a level.
    pub fn new(building: impl Into<String>, floor: u32) -> Self {
        Self {
            building: building.into(),
            floor,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} F{}", self.building, self.floor)
    }
}

/// A point of interest or junction on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identity
    pub id: NodeId,
    /// Location on the floorplan
    #[serde(flatten)]
    pub position: Position,
    /// Building identifier
    pub building: String,
    /// Floor number (>= 1)
    pub floor: u32,
}

impl Node {
    /// Create a node with an explicit identity.
    pub fn new(
        id: impl Into<NodeId>,
        position: Position,
        building: impl Into<String>,
        floor: u32,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            building: building.into(),
            floor,
        }
    }

    /// The `(building, floor)` this node sits on.
    pub fn level(&self) -> Level {
        Level::new(self.building.clone(), self.floor)
    }

    /// Check the node invariants: non-empty id and building, finite
    /// position, floor >= 1.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.id.as_str().is_empty() {
            return Err("identity must not be empty".to_string());
        }
        if self.building.is_empty() {
            return Err("building must not be empty".to_string());
        }
        if !self.position.is_finite() {
            return Err(format!(
                "position ({}, {}) is not finite",
                self.position.x, self.position.y
            ));
        }
        if self.floor == 0 {
            return Err("floor numbers start at 1".to_string());
        }
        Ok(())
    }
}

/// An undirected navigable connection between two distinct nodes.
///
/// `from`/`to` keep the orientation the edge was authored with; equality of
/// connections is decided by [`Edge::key`], which ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// First endpoint as authored
    pub from: NodeId,
    /// Second endpoint as authored
    pub to: NodeId,
}

impl Edge {
    /// Create an edge.
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Orientation-free key of this edge.
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(&self.from, &self.to)
    }
}

/// Unordered node pair, stored smallest identity first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(NodeId, NodeId);

impl EdgeKey {
    /// Build the key for the pair `a`, `b` in either order.
    pub fn new(a: &NodeId, b: &NodeId) -> Self {
        if a <= b {
            Self(a.clone(), b.clone())
        } else {
            Self(b.clone(), a.clone())
        }
    }

    /// The smaller endpoint.
    pub fn low(&self) -> &NodeId {
        &self.0
    }

    /// The larger endpoint.
    pub fn high(&self) -> &NodeId {
        &self.1
    }
}
