//! Map authoring state machine.
//!
//! The controller turns raw pointer events from the map editor into graph
//! mutations:
//!
//! - clicking empty canvas adds a node on the attached floorplan's level;
//! - pressing two different nodes one after the other connects them;
//! - pressing and dragging a node moves it.
//!
//! Selection (for edge authoring) and dragging are independent: every press
//! on a node both updates the selection and starts a drag, and releasing the
//! pointer ends the drag without touching the selection.

use crate::error::Result;
use crate::graph::{FloorGraph, NodeId, Position};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// The floorplan image being authored on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floorplan {
    /// Image reference (URL or path); opaque to the controller
    pub image: String,
    /// Building new nodes are placed in
    pub building: String,
    /// Floor new nodes are placed on
    pub floor: u32,
}

impl Floorplan {
    /// Create a floorplan description.
    pub fn new(image: impl Into<String>, building: impl Into<String>, floor: u32) -> Self {
        Self {
            image: image.into(),
            building: building.into(),
            floor,
        }
    }
}

/// Edge-authoring selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Nothing selected
    #[default]
    Empty,
    /// One node selected; pressing another connects the two
    One(NodeId),
}

#[derive(Debug, Clone)]
struct Drag {
    node: NodeId,
    grab_offset: Position,
}

/// What an input event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOutcome {
    /// The event had no effect
    Ignored,
    /// A node was created
    NodeAdded(NodeId),
    /// A node became the selection
    Selected(NodeId),
    /// The selected node was pressed again and deselected
    Deselected(NodeId),
    /// Two nodes were connected; `created` is false if they already were
    EdgeAdded {
        /// Previously selected node
        from: NodeId,
        /// Node just pressed
        to: NodeId,
        /// Whether a new edge was stored
        created: bool,
    },
    /// The dragged node moved
    Moved(NodeId),
    /// A drag finished
    DragEnded(NodeId),
}

/// Editor state over a [`FloorGraph`].
pub struct EditorController {
    graph: FloorGraph,
    floorplan: Option<Floorplan>,
    selection: Selection,
    drag: Option<Drag>,
}

impl EditorController {
    /// Editor over `graph` with no floorplan attached yet.
    pub fn new(graph: FloorGraph) -> Self {
        Self {
            graph,
            floorplan: None,
            selection: Selection::Empty,
            drag: None,
        }
    }

    /// Resume editing an existing map on `floorplan`, keeping its content.
    pub fn resume(graph: FloorGraph, floorplan: Floorplan) -> Self {
        Self {
            floorplan: Some(floorplan),
            ..Self::new(graph)
        }
    }

    /// Attach a new floorplan. The map starts over empty.
    pub fn attach_floorplan(&mut self, floorplan: Floorplan) -> Result<()> {
        debug!(
            "Attaching floorplan {} ({} F{})",
            floorplan.image, floorplan.building, floorplan.floor
        );
        self.graph.clear()?;
        self.floorplan = Some(floorplan);
        self.selection = Selection::Empty;
        self.drag = None;
        Ok(())
    }

    /// Click on empty canvas at `point`.
    ///
    /// Adds a node there when a floorplan is attached and no drag is in
    /// progress; otherwise ignored.
    ///
    /// # Errors
    ///
    /// Propagates [`FloorGraph::add_node`] errors.
    pub fn canvas_click(&mut self, point: Position) -> Result<EditorOutcome> {
        let Some(floorplan) = &self.floorplan else {
            trace!("Canvas click ignored: no floorplan");
            return Ok(EditorOutcome::Ignored);
        };
        if self.drag.is_some() {
            trace!("Canvas click ignored: drag in progress");
            return Ok(EditorOutcome::Ignored);
        }
        let id = self
            .graph
            .add_node(point, floorplan.building.clone(), floorplan.floor)?;
        Ok(EditorOutcome::NodeAdded(id))
    }

    /// Pointer pressed on node `id`, `grab_offset` away from its position.
    ///
    /// Starts a drag and advances the selection: empty selects the node,
    /// another selected node gets connected to it, the same node is
    /// deselected.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NodeNotFound`](crate::MapError::NodeNotFound) if
    /// the node doesn't exist. Nothing changes in that case.
    pub fn pointer_down_on_node(&mut self, id: &str, grab_offset: Position) -> Result<EditorOutcome> {
        let node = self.graph.get_node(id)?.id.clone();

        let outcome = match std::mem::take(&mut self.selection) {
            Selection::Empty => {
                self.selection = Selection::One(node.clone());
                EditorOutcome::Selected(node.clone())
            }
            Selection::One(selected) if selected == node => EditorOutcome::Deselected(node.clone()),
            Selection::One(selected) => match self.graph.add_edge(&selected, &node) {
                Ok(created) => EditorOutcome::EdgeAdded {
                    from: selected,
                    to: node.clone(),
                    created,
                },
                Err(e) => {
                    self.selection = Selection::One(selected);
                    return Err(e);
                }
            },
        };

        self.drag = Some(Drag {
            node,
            grab_offset,
        });
        Ok(outcome)
    }

    /// Pointer moved to `cursor`. Moves the dragged node, if any.
    pub fn pointer_move(&mut self, cursor: Position) -> Result<EditorOutcome> {
        let Some(drag) = &self.drag else {
            return Ok(EditorOutcome::Ignored);
        };
        self.graph
            .move_node(&drag.node, cursor - drag.grab_offset)?;
        Ok(EditorOutcome::Moved(drag.node.clone()))
    }

    /// Pointer released. Ends the drag; the selection is kept.
    pub fn pointer_up(&mut self) -> EditorOutcome {
        match self.drag.take() {
            Some(drag) => EditorOutcome::DragEnded(drag.node),
            None => EditorOutcome::Ignored,
        }
    }

    /// Drop the selection (the "Add Edge" button).
    pub fn reset_selection(&mut self) {
        self.selection = Selection::Empty;
    }

    /// Current edge-authoring selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Node being dragged, if any.
    pub fn dragging(&self) -> Option<&NodeId> {
        self.drag.as_ref().map(|drag| &drag.node)
    }

    /// Attached floorplan, if any.
    pub fn floorplan(&self) -> Option<&Floorplan> {
        self.floorplan.as_ref()
    }

    /// The map being edited.
    pub fn graph(&self) -> &FloorGraph {
        &self.graph
    }

    /// Finish editing and hand back the map.
    pub fn into_graph(self) -> FloorGraph {
        self.graph
    }
}
