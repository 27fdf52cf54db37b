//! Scan-to-route facade used by the navigation app.
//!
//! Wires the marker codec, the session manager and the routing engine
//! together: scanned text goes in, a [`RouteView`] comes out. The "no route"
//! case is a view of its own so the app can show it instead of a blank map.

use crate::config::NavigatorConfig;
use crate::error::{MapError, Result};
use crate::graph::algorithms::{self, LevelChange};
use crate::graph::{FloorGraph, NodeId};
use crate::qr::{Decoded, DecodeFailure, QrCodec};
use crate::session::{ActiveRoute, Clock, RouteStatus, ScanTransition, SessionManager, SessionState};
use crate::storage::{MemoryBackend, StorageBackend};
use log::{debug, info};

/// What the app should show for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteView {
    /// No session: prompt the user to scan a marker
    NoSession,
    /// A route from the session start to its destination
    Path {
        /// Nodes from start to destination, both included
        path: Vec<NodeId>,
        /// Session status
        status: RouteStatus,
        /// Steps that change building or floor
        level_changes: Vec<LevelChange>,
    },
    /// The session endpoints are not connected (or not on the map)
    NoRoute {
        /// Session start
        start: NodeId,
        /// Session destination
        end: NodeId,
        /// Session status
        status: RouteStatus,
    },
}

impl RouteView {
    /// Whether the user stands on the destination.
    pub fn arrived(&self) -> bool {
        matches!(self, RouteView::Path { path, .. } if path.len() == 1)
    }
}

/// Result of feeding scanned text to the navigator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The text was not a marker; the session is untouched
    Unrecognized(DecodeFailure),
    /// The session changed
    Transition(ScanTransition),
}

/// Navigation session driven by marker scans.
pub struct Navigator {
    codec: QrCodec,
    sessions: SessionManager,
    default_destination: Option<String>,
}

impl Navigator {
    /// Navigator persisting its session in `storage`.
    pub fn new(config: NavigatorConfig, storage: Box<dyn StorageBackend>) -> Self {
        let sessions = SessionManager::new(storage).with_history_limit(config.history_limit);
        Self {
            codec: QrCodec::with_scheme(config.uri_scheme),
            sessions,
            default_destination: config.default_destination,
        }
    }

    /// Navigator with an in-memory session store.
    pub fn in_memory(config: NavigatorConfig) -> Self {
        Self::new(config, Box::new(MemoryBackend::new()))
    }

    /// Replace the session clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.sessions = self.sessions.with_clock(clock);
        self
    }

    /// Feed scanned text.
    ///
    /// `destination` is used when the scan starts a new session; the
    /// configured default applies when it is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::MissingDestination`] if a new session is needed
    /// and no destination is available.
    pub fn handle_scan(&mut self, text: &str, destination: Option<&str>) -> Result<ScanOutcome> {
        let payload = match self.codec.parse(text) {
            Decoded::Valid(payload) => payload,
            Decoded::Invalid(failure) => {
                debug!("Scan ignored: {failure}");
                return Ok(ScanOutcome::Unrecognized(failure));
            }
        };
        let destination = destination.or(self.default_destination.as_deref());
        let transition = self.sessions.on_scan(&payload, destination)?;
        info!(
            "Scan at {} ({}): {} -> {}",
            payload.node_id(),
            payload.level(),
            transition.route().start_node,
            transition.route().end_node
        );
        Ok(ScanOutcome::Transition(transition))
    }

    /// Route for the current session over `graph`.
    pub fn current_route(&self, graph: &FloorGraph) -> Result<RouteView> {
        let route = match self.sessions.state()? {
            SessionState::NoSession => return Ok(RouteView::NoSession),
            SessionState::Active(route) | SessionState::Completed(route) => route,
        };
        let ActiveRoute {
            start_node,
            end_node,
            status,
            ..
        } = route;

        match algorithms::route(graph, &start_node, &end_node) {
            Ok(path) => {
                let level_changes = algorithms::level_changes(graph, &path)?;
                Ok(RouteView::Path {
                    path,
                    status,
                    level_changes,
                })
            }
            Err(MapError::NoPath { .. } | MapError::NodeNotFound { .. }) => {
                debug!("No route from {start_node} to {end_node}");
                Ok(RouteView::NoRoute {
                    start: start_node,
                    end: end_node,
                    status,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Mark the session as arrived.
    pub fn complete(&mut self) -> Result<ActiveRoute> {
        self.sessions.complete()
    }

    /// Abandon the session.
    pub fn clear(&mut self) -> Result<()> {
        self.sessions.clear()
    }

    /// The underlying session manager.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }
}
