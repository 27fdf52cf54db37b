//! The route session state machine and its persisted records.

use super::clock::{Clock, SystemClock};
use super::record::{ActiveRoute, RouteHistoryEntry, RouteStatus, ScanTransition, SessionState};
use crate::error::{MapError, Result};
use crate::graph::NodeId;
use crate::qr::QrPayload;
use crate::storage::{MemoryBackend, StorageBackend, WriteOp};
use log::{debug, info, trace, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Storage key of the session record.
pub const ACTIVE_ROUTE_KEY: &str = "activeRoute";

/// Storage key of the history log.
pub const ROUTE_HISTORY_KEY: &str = "routeHistory";

/// Number of history entries kept by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Owner of the device's navigation session.
///
/// ```text
///   NoSession ──scan──▶ Active ──complete──▶ Completed
///       ▲                │  ▲                    │
///       │                └──┘ scan (recalibrate) │
///       └────── clear ◀── any ──────── scan ─────┘ (new session)
/// ```
///
/// Each transition writes the session record and, when it changes, the
/// history log in a single storage batch. Records that cannot be parsed are
/// treated as absent.
pub struct SessionManager {
    storage: Box<dyn StorageBackend>,
    clock: Box<dyn Clock>,
    history_limit: usize,
}

impl SessionManager {
    /// Manage the session stored in `storage`, using the system clock.
    pub fn new(storage: Box<dyn StorageBackend>) -> Self {
        Self {
            storage,
            clock: Box::new(SystemClock),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// A manager over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Keep at most `limit` history entries.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Current session state.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Storage`] if the record cannot be read.
    pub fn state(&self) -> Result<SessionState> {
        Ok(SessionState::from_record(self.load_route()?))
    }

    /// Route history, most recent first.
    pub fn history(&self) -> Result<Vec<RouteHistoryEntry>> {
        Ok(self
            .load_record::<Vec<RouteHistoryEntry>>(ROUTE_HISTORY_KEY)?
            .unwrap_or_default())
    }

    /// Apply a scan of `payload`.
    ///
    /// With no session, or a completed one, a new session from the scanned
    /// node to `destination` is started and logged. With an active session
    /// the start node is recalibrated to the scanned node and `destination`
    /// is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::MissingDestination`] if a new session is needed
    /// and `destination` is `None`.
    pub fn on_scan(
        &mut self,
        payload: &QrPayload,
        destination: Option<&str>,
    ) -> Result<ScanTransition> {
        let now = self.clock.now_millis();
        let scanned = payload.node_id().clone();

        match self.state()? {
            SessionState::Active(mut route) => {
                debug!(
                    "Recalibrating session: start {} -> {scanned}, destination {}",
                    route.start_node, route.end_node
                );
                route.start_node = scanned;
                route.last_updated = now.max(route.last_updated);
                self.storage
                    .write_batch(vec![WriteOp::set(ACTIVE_ROUTE_KEY, to_json(&route)?)])?;
                Ok(ScanTransition::Recalibrated(route))
            }
            previous => {
                let end = destination.ok_or(MapError::MissingDestination)?;
                let route = ActiveRoute {
                    start_node: scanned,
                    end_node: NodeId::from(end),
                    last_updated: now,
                    status: RouteStatus::Active,
                };
                info!(
                    "Starting session {} -> {} (was {})",
                    route.start_node,
                    route.end_node,
                    previous.name()
                );

                let mut history = self.history()?;
                history.insert(
                    0,
                    RouteHistoryEntry {
                        start: route.start_node.clone(),
                        end: route.end_node.clone(),
                        completed: false,
                        timestamp: now,
                    },
                );
                history.truncate(self.history_limit);

                self.storage.write_batch(vec![
                    WriteOp::set(ACTIVE_ROUTE_KEY, to_json(&route)?),
                    WriteOp::set(ROUTE_HISTORY_KEY, to_json(&history)?),
                ])?;

                Ok(match previous {
                    SessionState::Completed(_) => ScanTransition::Restarted(route),
                    _ => ScanTransition::Started(route),
                })
            }
        }
    }

    /// Mark the active session as having reached its destination.
    ///
    /// The newest history entry is marked completed when it belongs to this
    /// session, that is when it has the same destination and is still open.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidTransition`] unless a session is active.
    pub fn complete(&mut self) -> Result<ActiveRoute> {
        let mut route = match self.state()? {
            SessionState::Active(route) => route,
            other => {
                return Err(MapError::InvalidTransition {
                    action: "complete",
                    state: other.name(),
                })
            }
        };
        route.status = RouteStatus::Completed;
        route.last_updated = self.clock.now_millis().max(route.last_updated);

        let mut operations = vec![WriteOp::set(ACTIVE_ROUTE_KEY, to_json(&route)?)];
        let mut history = self.history()?;
        match history.first_mut() {
            Some(newest) if newest.end == route.end_node && !newest.completed => {
                newest.completed = true;
                operations.push(WriteOp::set(ROUTE_HISTORY_KEY, to_json(&history)?));
            }
            _ => trace!("No open history entry for destination {}", route.end_node),
        }
        self.storage.write_batch(operations)?;

        info!("Session {} -> {} completed", route.start_node, route.end_node);
        Ok(route)
    }

    /// Forget the session, whatever its state. History is kept.
    pub fn clear(&mut self) -> Result<()> {
        debug!("Clearing session");
        self.storage
            .write_batch(vec![WriteOp::remove(ACTIVE_ROUTE_KEY)])
    }

    /// Drop every history entry.
    pub fn clear_history(&mut self) -> Result<()> {
        debug!("Clearing route history");
        self.storage
            .write_batch(vec![WriteOp::remove(ROUTE_HISTORY_KEY)])
    }

    /// Flush the underlying storage.
    pub fn flush(&mut self) -> Result<()> {
        self.storage.flush()
    }

    fn load_route(&self) -> Result<Option<ActiveRoute>> {
        self.load_record(ACTIVE_ROUTE_KEY)
    }

    fn load_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.storage.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Ignoring unreadable {key} record: {e}");
                Ok(None)
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| MapError::serialization("Failed to serialize session record", Some(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ManualClock;

    fn scan(node: &str) -> QrPayload {
        QrPayload::new(node, "BLDG_A", 1).unwrap()
    }

    fn manager_at(millis: i64) -> (SessionManager, ManualClock, MemoryBackend) {
        let clock = ManualClock::new(millis);
        let backend = MemoryBackend::new();
        let manager = SessionManager::new(Box::new(backend.clone())).with_clock(clock.clone());
        (manager, clock, backend)
    }

    #[test]
    fn test_new_session_needs_destination() {
        let (mut manager, _, _) = manager_at(0);
        assert!(matches!(
            manager.on_scan(&scan("A"), None),
            Err(MapError::MissingDestination)
        ));
        assert_eq!(manager.state().unwrap(), SessionState::NoSession);
    }

    #[test]
    fn test_recalibration_keeps_timestamp_monotonic() {
        let (mut manager, clock, _) = manager_at(5_000);
        manager.on_scan(&scan("A"), Some("DEST")).unwrap();

        clock.set(1_000);
        let transition = manager.on_scan(&scan("B"), None).unwrap();
        assert!(!transition.is_new_session());
        assert_eq!(transition.route().last_updated, 5_000);
        assert_eq!(transition.route().start_node.as_str(), "B");
        assert_eq!(manager.history().unwrap().len(), 1);
    }

    #[test]
    fn test_history_is_capped() {
        let (manager, clock, _) = manager_at(0);
        let mut manager = manager.with_history_limit(3);
        for i in 0..5 {
            clock.set(i);
            manager.on_scan(&scan("A"), Some(&format!("D{i}"))).unwrap();
            manager.complete().unwrap();
        }
        let history = manager.history().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].end.as_str(), "D4");
        assert!(history.iter().all(|entry| entry.completed));
    }

    #[test]
    fn test_corrupt_records_are_absent() {
        let (mut manager, _, mut backend) = manager_at(0);
        backend.set(ACTIVE_ROUTE_KEY, "{not json").unwrap();
        backend.set(ROUTE_HISTORY_KEY, "42").unwrap();

        assert_eq!(manager.state().unwrap(), SessionState::NoSession);
        assert!(manager.history().unwrap().is_empty());

        // A scan overwrites the corrupt records
        manager.on_scan(&scan("A"), Some("B")).unwrap();
        assert!(manager.state().unwrap().is_active());
        assert_eq!(manager.history().unwrap().len(), 1);
    }

    #[test]
    fn test_complete_outside_active_is_rejected() {
        let (mut manager, _, _) = manager_at(0);
        let err = manager.complete().unwrap_err();
        assert_eq!(err.to_string(), "Cannot complete while session is no session");

        manager.on_scan(&scan("A"), Some("B")).unwrap();
        manager.complete().unwrap();
        assert!(matches!(
            manager.complete(),
            Err(MapError::InvalidTransition { state: "completed", .. })
        ));
    }
}
