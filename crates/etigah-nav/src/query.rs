//! Fluent node queries.
//!
//! Used by the presentation layer to pick the nodes of the floor being shown
//! and to hit-test pointer positions against node markers.

use crate::graph::{FloorGraph, Node, NodeId, Position};

/// A filter predicate that can be applied to nodes.
type FilterFn = Box<dyn Fn(&Node) -> bool>;

/// Fluent query builder over the nodes of a [`FloorGraph`].
///
/// # Examples
///
/// ```
/// use etigah_nav::{FloorGraph, Position};
///
/// # fn example() -> etigah_nav::Result<()> {
/// let mut graph = FloorGraph::in_memory()?;
/// graph.add_node(Position::new(10.0, 10.0), "BLDG_A", 2)?;
///
/// let second_floor = graph.query().building("BLDG_A").floor(2).execute();
/// assert_eq!(second_floor.len(), 1);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct NodeQuery<'a> {
    graph: &'a FloorGraph,
    filters: Vec<FilterFn>,
    limit_value: Option<usize>,
}

impl<'a> NodeQuery<'a> {
    /// Create a new query over all nodes of `graph`.
    pub fn new(graph: &'a FloorGraph) -> Self {
        Self {
            graph,
            filters: Vec::new(),
            limit_value: None,
        }
    }

    /// Keep nodes in this building.
    pub fn building(mut self, building: &str) -> Self {
        let building = building.to_string();
        self.filters.push(Box::new(move |node| node.building == building));
        self
    }

    /// Keep nodes on this floor (of any building unless combined with
    /// [`NodeQuery::building`]).
    pub fn floor(mut self, floor: u32) -> Self {
        self.filters.push(Box::new(move |node| node.floor == floor));
        self
    }

    /// Keep nodes inside the axis-aligned box spanned by two corners.
    pub fn within(mut self, corner: Position, opposite: Position) -> Self {
        let (min_x, max_x) = (corner.x.min(opposite.x), corner.x.max(opposite.x));
        let (min_y, max_y) = (corner.y.min(opposite.y), corner.y.max(opposite.y));
        self.filters.push(Box::new(move |node| {
            let p = node.position;
            (min_x..=max_x).contains(&p.x) && (min_y..=max_y).contains(&p.y)
        }));
        self
    }

    /// Keep nodes at most `radius` away from `point`.
    pub fn near(mut self, point: Position, radius: f64) -> Self {
        self.filters
            .push(Box::new(move |node| node.position.distance_to(point) <= radius));
        self
    }

    /// Keep nodes matching a custom predicate.
    pub fn custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Node) -> bool + 'static,
    {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Limit the number of results returned.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit_value = Some(n);
        self
    }

    /// Matching identities, in identity order.
    pub fn execute(&self) -> Vec<NodeId> {
        self.matching()
            .take(self.limit_value.unwrap_or(usize::MAX))
            .map(|node| node.id.clone())
            .collect()
    }

    /// Number of matching nodes (ignores the limit).
    pub fn count(&self) -> usize {
        self.matching().count()
    }

    /// Whether any node matches.
    pub fn exists(&self) -> bool {
        self.matching().next().is_some()
    }

    /// The matching node closest to `point`; ties go to the smaller identity.
    pub fn closest_to(&self, point: Position) -> Option<NodeId> {
        self.matching()
            .map(|node| (node.position.distance_to(point), node))
            .fold(None, |best: Option<(f64, &Node)>, candidate| match best {
                Some(current) if current.0 <= candidate.0 => Some(current),
                _ => Some(candidate),
            })
            .map(|(_, node)| node.id.clone())
    }

    fn matching(&self) -> impl Iterator<Item = &'a Node> + '_ {
        self.graph
            .nodes()
            .filter(move |node| self.filters.iter().all(|filter| filter(node)))
    }
}
