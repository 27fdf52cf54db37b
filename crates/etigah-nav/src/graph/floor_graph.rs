//! The map graph store: nodes, undirected edges, and their persisted records.

use super::types::{Edge, EdgeKey, Level, Node, NodeId, Position};
use crate::error::{MapError, Result};
use crate::export::GraphSnapshot;
use crate::storage::{MemoryBackend, StorageBackend, WriteOp};
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const NODE_PREFIX: &str = "node:";
const EDGE_PREFIX: &str = "edge:";
const COUNTERS_KEY: &str = "meta:counters";

/// Indoor map graph for one floorplan (or a set of connected floorplans).
///
/// Every mutation is validated against the in-memory state first, then
/// written to storage as one batch, and only then applied to the caches.
/// A rejected or failed mutation leaves both untouched.
pub struct FloorGraph {
    storage: Box<dyn StorageBackend>,
    // Next candidate for `node-<n>` allocation; never decreases
    node_counter: u64,
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeKey, Edge>,
    adjacency: HashMap<NodeId, BTreeSet<NodeId>>,
}

impl FloorGraph {
    /// Open a graph on the given backend, loading any stored nodes and edges.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Storage`] if the backend cannot be read and
    /// [`MapError::Serialization`] if a node record is unreadable.
    pub fn with_backend(backend: Box<dyn StorageBackend>) -> Result<Self> {
        let mut graph = Self {
            storage: backend,
            node_counter: 0,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            adjacency: HashMap::new(),
        };

        graph.rebuild_from_storage()?;

        Ok(graph)
    }

    /// Open a persistent graph stored with RocksDB at `path`.
    #[cfg(feature = "rocksdb-backend")]
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        use crate::storage::RocksDBBackend;
        info!("Opening map graph at path: {:?}", path.as_ref());
        let backend = RocksDBBackend::open(path)?;
        Self::with_backend(Box::new(backend))
    }

    /// Create an empty graph backed by memory only.
    pub fn in_memory() -> Result<Self> {
        Self::with_backend(Box::new(MemoryBackend::new()))
    }

    /// Add a node at `position` and return its freshly allocated identity.
    ///
    /// Identities come from a store-owned counter (`node-0`, `node-1`, ...)
    /// that skips any identity already present, so nodes inserted with
    /// explicit identities never collide with allocated ones.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidNode`] for a non-finite position or floor 0.
    pub fn add_node(
        &mut self,
        position: Position,
        building: impl Into<String>,
        floor: u32,
    ) -> Result<NodeId> {
        let (id, next_counter) = self.next_free_id();
        let node = Node::new(id.clone(), position, building, floor);
        node.validate().map_err(|message| MapError::InvalidNode {
            node_id: "<new>".to_string(),
            message,
        })?;
        debug!("Adding node: id={id}, level={}", node.level());

        self.storage.write_batch(vec![
            WriteOp::set(node_key(&id), to_json(&node, "node")?),
            WriteOp::set(COUNTERS_KEY, counters_json(next_counter)?),
        ])?;

        self.node_counter = next_counter;
        self.nodes.insert(id.clone(), node);
        trace!("Node {id} added successfully");

        Ok(id)
    }

    /// Insert a node that already carries its identity.
    ///
    /// An identity of the allocated form `node-<n>` moves the counter past
    /// `n`, so it is never handed out by [`FloorGraph::add_node`] later, even
    /// after this node is removed.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::DuplicateNode`] if the identity is taken and
    /// [`MapError::InvalidNode`] if the node breaks an invariant.
    pub fn insert_node(&mut self, node: Node) -> Result<()> {
        node.validate().map_err(|message| MapError::InvalidNode {
            node_id: node.id.to_string(),
            message,
        })?;
        if self.nodes.contains_key(&node.id) {
            return Err(MapError::DuplicateNode {
                node_id: node.id.to_string(),
            });
        }
        debug!("Inserting node: id={}, level={}", node.id, node.level());

        let next_counter = self.node_counter.max(counter_after(&node.id));
        self.storage.write_batch(vec![
            WriteOp::set(node_key(&node.id), to_json(&node, "node")?),
            WriteOp::set(COUNTERS_KEY, counters_json(next_counter)?),
        ])?;

        self.node_counter = next_counter;
        self.nodes.insert(node.id.clone(), node);

        Ok(())
    }

    /// Get a node by identity.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NodeNotFound`] if the node doesn't exist.
    pub fn get_node(&self, id: &str) -> Result<&Node> {
        self.nodes.get(id).ok_or_else(|| MapError::node_not_found(id))
    }

    /// Whether a node with this identity exists.
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Move a node. Topology is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NodeNotFound`] if the node doesn't exist and
    /// [`MapError::InvalidNode`] if `position` is not finite.
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<()> {
        let mut moved = self.get_node(id)?.clone();
        moved.position = position;
        moved.validate().map_err(|message| MapError::InvalidNode {
            node_id: id.to_string(),
            message,
        })?;
        trace!("Moving node {id} to ({}, {})", position.x, position.y);

        self.storage
            .set(&node_key(&moved.id), &to_json(&moved, "node")?)?;
        self.nodes.insert(moved.id.clone(), moved);

        Ok(())
    }

    /// Remove a node and every edge touching it, in one storage batch.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NodeNotFound`] if the node doesn't exist.
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        let node_id = self.get_node(id)?.id.clone();
        let incident: Vec<EdgeKey> = self
            .adjacency
            .get(&node_id)
            .map(|peers| peers.iter().map(|peer| EdgeKey::new(&node_id, peer)).collect())
            .unwrap_or_default();
        debug!(
            "Removing node: id={node_id} with {} connected edges",
            incident.len()
        );

        let mut operations: Vec<WriteOp> = incident
            .iter()
            .map(|key| Ok(WriteOp::remove(edge_key(key)?)))
            .collect::<Result<_>>()?;
        operations.push(WriteOp::remove(node_key(&node_id)));
        self.storage.write_batch(operations)?;

        for key in &incident {
            self.unlink(key);
        }
        self.adjacency.remove(&node_id);
        self.nodes.remove(&node_id);

        Ok(())
    }

    /// Connect two nodes.
    ///
    /// Returns `true` if a new edge was stored and `false` if the pair (in
    /// either orientation) was already connected.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NodeNotFound`] if either endpoint is missing and
    /// [`MapError::InvalidEdge`] if `a == b`.
    pub fn add_edge(&mut self, a: &str, b: &str) -> Result<bool> {
        let from = self.get_node(a)?.id.clone();
        let to = self.get_node(b)?.id.clone();
        if from == to {
            return Err(MapError::InvalidEdge {
                node_id: from.into_string(),
            });
        }

        let edge = Edge::new(from, to);
        let key = edge.key();
        if self.edges.contains_key(&key) {
            trace!("Edge {a} <-> {b} already present");
            return Ok(false);
        }
        debug!("Adding edge: {a} <-> {b}");

        self.storage.set(&edge_key(&key)?, &to_json(&edge, "edge")?)?;
        self.link(edge);

        Ok(true)
    }

    /// Disconnect two nodes.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::EdgeNotFound`] if they are not connected.
    pub fn remove_edge(&mut self, a: &str, b: &str) -> Result<()> {
        let key = EdgeKey::new(&NodeId::from(a), &NodeId::from(b));
        if !self.edges.contains_key(&key) {
            return Err(MapError::EdgeNotFound {
                from: a.to_string(),
                to: b.to_string(),
            });
        }
        debug!("Removing edge: {a} <-> {b}");

        self.storage.remove(&edge_key(&key)?)?;
        self.unlink(&key);

        Ok(())
    }

    /// Whether `a` and `b` are directly connected.
    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.adjacency
            .get(a)
            .is_some_and(|peers| peers.contains(b))
    }

    /// Identities adjacent to `id`, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NodeNotFound`] if the node doesn't exist.
    pub fn neighbors(&self, id: &str) -> Result<Vec<NodeId>> {
        self.get_node(id)?;
        Ok(self.adjacent(id).cloned().collect())
    }

    /// Adjacent identities in ascending order; empty for unknown nodes.
    pub(crate) fn adjacent<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.adjacency.get(id).into_iter().flatten()
    }

    /// All nodes, ordered by identity.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges, ordered by their unordered endpoint pair.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Distinct `(building, floor)` pairs present in the map.
    pub fn levels(&self) -> BTreeSet<Level> {
        self.nodes.values().map(Node::level).collect()
    }

    /// Start a filtered node query.
    pub fn query(&self) -> crate::query::NodeQuery<'_> {
        crate::query::NodeQuery::new(self)
    }

    /// Shortest route between two nodes, see [`super::algorithms::find_route`].
    pub fn find_route(&self, start: &str, end: &str) -> Option<Vec<NodeId>> {
        super::algorithms::find_route(self, start, end)
    }

    /// Remove every node and edge.
    ///
    /// The identity counter is kept, so identities handed out before the
    /// clear are never reissued.
    pub fn clear(&mut self) -> Result<()> {
        info!(
            "Clearing map graph ({} nodes, {} edges)",
            self.nodes.len(),
            self.edges.len()
        );
        let operations = self.removal_ops()?;
        self.storage.write_batch(operations)?;

        self.nodes.clear();
        self.edges.clear();
        self.adjacency.clear();

        Ok(())
    }

    /// Copy of the full graph content.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    /// Replace the whole graph with `snapshot`.
    ///
    /// The snapshot is validated in full before anything is written: node
    /// invariants, unique identities, no self-loops, no dangling edges.
    /// Duplicate edges in the snapshot are merged. The identity counter moves
    /// past every allocated-form identity in the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidSnapshot`] and leaves the graph unchanged
    /// if validation fails.
    pub fn restore(&mut self, snapshot: GraphSnapshot) -> Result<()> {
        let (nodes, edges) = validate_snapshot(snapshot)?;
        info!(
            "Restoring map graph from snapshot ({} nodes, {} edges)",
            nodes.len(),
            edges.len()
        );

        let next_counter = nodes
            .keys()
            .map(counter_after)
            .fold(self.node_counter, u64::max);

        let mut operations = self.removal_ops()?;
        operations.push(WriteOp::set(COUNTERS_KEY, counters_json(next_counter)?));
        for node in nodes.values() {
            operations.push(WriteOp::set(node_key(&node.id), to_json(node, "node")?));
        }
        for (key, edge) in &edges {
            operations.push(WriteOp::set(edge_key(key)?, to_json(edge, "edge")?));
        }
        self.storage.write_batch(operations)?;

        self.node_counter = next_counter;
        self.nodes = nodes;
        self.edges.clear();
        self.adjacency.clear();
        for edge in edges.into_values() {
            self.link(edge);
        }

        Ok(())
    }

    /// Flush buffered writes and persist the identity counter.
    pub fn flush(&mut self) -> Result<()> {
        debug!("Flushing map graph");
        self.storage
            .set(COUNTERS_KEY, &counters_json(self.node_counter)?)?;
        self.storage.flush()
    }

    /// Flush and drop the graph.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    // Private helper methods

    fn next_free_id(&self) -> (NodeId, u64) {
        let mut counter = self.node_counter;
        loop {
            let candidate = NodeId::new(format!("node-{counter}"));
            counter += 1;
            if !self.nodes.contains_key(&candidate) {
                return (candidate, counter);
            }
        }
    }

    fn link(&mut self, edge: Edge) {
        self.adjacency
            .entry(edge.from.clone())
            .or_default()
            .insert(edge.to.clone());
        self.adjacency
            .entry(edge.to.clone())
            .or_default()
            .insert(edge.from.clone());
        self.edges.insert(edge.key(), edge);
    }

    fn unlink(&mut self, key: &EdgeKey) {
        if let Some(peers) = self.adjacency.get_mut(key.low()) {
            peers.remove(key.high());
        }
        if let Some(peers) = self.adjacency.get_mut(key.high()) {
            peers.remove(key.low());
        }
        self.edges.remove(key);
    }

    // Every stored graph record, including ones the cache never loaded
    fn removal_ops(&self) -> Result<Vec<WriteOp>> {
        let mut operations = Vec::new();
        for prefix in [NODE_PREFIX, EDGE_PREFIX] {
            for (key, _) in self.storage.scan_prefix(prefix)? {
                operations.push(WriteOp::remove(key));
            }
        }
        Ok(operations)
    }

    fn rebuild_from_storage(&mut self) -> Result<()> {
        if let Some(raw) = self.storage.get(COUNTERS_KEY)? {
            let counters: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
                MapError::serialization("Failed to deserialize counters", Some(e))
            })?;
            if let Some(node_counter) = counters.get("node_counter").and_then(|v| v.as_u64()) {
                self.node_counter = node_counter;
            }
        }

        for (_, raw) in self.storage.scan_prefix(NODE_PREFIX)? {
            let node: Node = serde_json::from_str(&raw)
                .map_err(|e| MapError::serialization("Failed to deserialize node", Some(e)))?;
            self.node_counter = self.node_counter.max(counter_after(&node.id));
            self.nodes.insert(node.id.clone(), node);
        }

        let mut stale = Vec::new();
        for (key, raw) in self.storage.scan_prefix(EDGE_PREFIX)? {
            let edge: Edge = serde_json::from_str(&raw)
                .map_err(|e| MapError::serialization("Failed to deserialize edge", Some(e)))?;
            if edge.from == edge.to
                || !self.nodes.contains_key(&edge.from)
                || !self.nodes.contains_key(&edge.to)
            {
                warn!("Dropping stored edge {key}: endpoints missing or identical");
                stale.push(WriteOp::remove(key));
                continue;
            }
            self.link(edge);
        }
        if !stale.is_empty() {
            self.storage.write_batch(stale)?;
        }

        debug!(
            "Loaded map graph: {} nodes, {} edges",
            self.nodes.len(),
            self.edges.len()
        );
        Ok(())
    }
}

type ValidatedSnapshot = (BTreeMap<NodeId, Node>, BTreeMap<EdgeKey, Edge>);

fn validate_snapshot(snapshot: GraphSnapshot) -> Result<ValidatedSnapshot> {
    let invalid = |message: String| MapError::InvalidSnapshot { message };

    let mut nodes = BTreeMap::new();
    for node in snapshot.nodes {
        node.validate()
            .map_err(|message| invalid(format!("node {}: {message}", node.id)))?;
        if nodes.contains_key(&node.id) {
            return Err(invalid(format!("node {} appears twice", node.id)));
        }
        nodes.insert(node.id.clone(), node);
    }

    let mut edges = BTreeMap::new();
    for edge in snapshot.edges {
        if edge.from == edge.to {
            return Err(invalid(format!("edge {0} <-> {0} is a self-loop", edge.from)));
        }
        for end in [&edge.from, &edge.to] {
            if !nodes.contains_key(end) {
                return Err(invalid(format!(
                    "edge {} <-> {} references missing node {end}",
                    edge.from, edge.to
                )));
            }
        }
        edges.entry(edge.key()).or_insert(edge);
    }

    Ok((nodes, edges))
}

/// Counter value that lies past `id` if it has the allocated form `node-<n>`.
fn counter_after(id: &NodeId) -> u64 {
    id.strip_prefix("node-")
        .and_then(|n| n.parse::<u64>().ok())
        .map_or(0, |n| n.saturating_add(1))
}

fn node_key(id: &NodeId) -> String {
    format!("{NODE_PREFIX}{id}")
}

// JSON pair keeps keys unambiguous whatever characters identities contain
fn edge_key(key: &EdgeKey) -> Result<String> {
    let pair = serde_json::to_string(&(key.low(), key.high()))
        .map_err(|e| MapError::serialization("Failed to serialize edge key", Some(e)))?;
    Ok(format!("{EDGE_PREFIX}{pair}"))
}

fn counters_json(node_counter: u64) -> Result<String> {
    to_json(&serde_json::json!({ "node_counter": node_counter }), "counters")
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| MapError::serialization(format!("Failed to serialize {what}"), Some(e)))
}
