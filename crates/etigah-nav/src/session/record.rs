//! Persisted session and history records.

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};

/// Lifecycle status stored in the session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    /// Navigation in progress
    Active,
    /// Destination reached
    Completed,
}

/// The device's single navigation session, as stored under `activeRoute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRoute {
    /// Last scanned position of the user
    pub start_node: NodeId,
    /// Destination
    pub end_node: NodeId,
    /// Epoch milliseconds of the last transition
    pub last_updated: i64,
    /// Current status
    pub status: RouteStatus,
}

/// One entry of the `routeHistory` log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHistoryEntry {
    /// Node the session was started from
    pub start: NodeId,
    /// Destination
    pub end: NodeId,
    /// Whether the session reached its destination
    pub completed: bool,
    /// Epoch milliseconds when the session started
    pub timestamp: i64,
}

/// Snapshot of the session, as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No record stored
    NoSession,
    /// A route is being followed
    Active(ActiveRoute),
    /// The last route reached its destination
    Completed(ActiveRoute),
}

impl SessionState {
    pub(crate) fn from_record(record: Option<ActiveRoute>) -> Self {
        match record {
            None => SessionState::NoSession,
            Some(route) => match route.status {
                RouteStatus::Active => SessionState::Active(route),
                RouteStatus::Completed => SessionState::Completed(route),
            },
        }
    }

    /// Short human-readable name, used in transition errors.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::NoSession => "no session",
            SessionState::Active(_) => "active",
            SessionState::Completed(_) => "completed",
        }
    }

    /// The stored record, unless there is none.
    pub fn route(&self) -> Option<&ActiveRoute> {
        match self {
            SessionState::NoSession => None,
            SessionState::Active(route) | SessionState::Completed(route) => Some(route),
        }
    }

    /// Whether a route is being followed.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }
}

/// What a scan did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTransition {
    /// No session existed; a new one was started
    Started(ActiveRoute),
    /// The previous session was completed; a new one replaced it
    Restarted(ActiveRoute),
    /// The active session's start node was moved to the scanned node
    Recalibrated(ActiveRoute),
}

impl ScanTransition {
    /// The session record after the scan.
    pub fn route(&self) -> &ActiveRoute {
        match self {
            ScanTransition::Started(route)
            | ScanTransition::Restarted(route)
            | ScanTransition::Recalibrated(route) => route,
        }
    }

    /// Whether the scan created a new session (and history entry).
    pub fn is_new_session(&self) -> bool {
        !matches!(self, ScanTransition::Recalibrated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_route_wire_format() {
        let route = ActiveRoute {
            start_node: NodeId::from("A"),
            end_node: NodeId::from("NODE_DEST"),
            last_updated: 1_700_000_000_000,
            status: RouteStatus::Active,
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["startNode"], "A");
        assert_eq!(json["endNode"], "NODE_DEST");
        assert_eq!(json["lastUpdated"], 1_700_000_000_000_i64);
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn test_state_from_record() {
        assert_eq!(SessionState::from_record(None), SessionState::NoSession);
        let done: ActiveRoute = serde_json::from_str(
            r#"{"startNode":"A","endNode":"B","lastUpdated":5,"status":"completed"}"#,
        )
        .unwrap();
        let state = SessionState::from_record(Some(done));
        assert_eq!(state.name(), "completed");
        assert_eq!(state.route().map(|r| r.end_node.as_str()), Some("B"));
    }
}
