//! Integration tests for the route session lifecycle.

use etigah_nav::session::{ManualClock, ScanTransition, ACTIVE_ROUTE_KEY, ROUTE_HISTORY_KEY};
use etigah_nav::{
    decode, MemoryBackend, RouteStatus, SessionManager, SessionState, StorageBackend,
};

fn manager() -> (SessionManager, ManualClock, MemoryBackend) {
    let clock = ManualClock::new(1_000);
    let backend = MemoryBackend::new();
    let manager = SessionManager::new(Box::new(backend.clone())).with_clock(clock.clone());
    (manager, clock, backend)
}

#[test]
fn test_start_recalibrate_complete_clear() {
    let (mut manager, clock, backend) = manager();
    assert_eq!(manager.state().unwrap(), SessionState::NoSession);

    // Scan A: new session towards NODE_DEST
    let a = decode(r#"{"n":"A","b":"BLDG","f":1}"#).unwrap();
    let transition = manager.on_scan(&a, Some("NODE_DEST")).unwrap();
    assert!(matches!(transition, ScanTransition::Started(_)));

    let SessionState::Active(route) = manager.state().unwrap() else {
        panic!("expected an active session");
    };
    assert_eq!(route.start_node.as_str(), "A");
    assert_eq!(route.end_node.as_str(), "NODE_DEST");
    assert_eq!(route.last_updated, 1_000);

    let history = manager.history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].start.as_str(), "A");
    assert_eq!(history[0].end.as_str(), "NODE_DEST");
    assert!(!history[0].completed);

    // Scan B on the way: recalibrate, no new history entry
    clock.advance(30_000);
    let b = decode(r#"{"n":"B","b":"BLDG","f":1}"#).unwrap();
    let transition = manager.on_scan(&b, Some("ELSEWHERE")).unwrap();
    assert!(matches!(transition, ScanTransition::Recalibrated(_)));

    let SessionState::Active(route) = manager.state().unwrap() else {
        panic!("expected an active session");
    };
    assert_eq!(route.start_node.as_str(), "B");
    assert_eq!(route.end_node.as_str(), "NODE_DEST");
    assert_eq!(route.last_updated, 31_000);
    assert_eq!(manager.history().unwrap().len(), 1);

    // Arrive
    clock.advance(60_000);
    let done = manager.complete().unwrap();
    assert_eq!(done.status, RouteStatus::Completed);
    assert!(matches!(manager.state().unwrap(), SessionState::Completed(_)));
    assert!(manager.history().unwrap()[0].completed);

    let stored: serde_json::Value =
        serde_json::from_str(&backend.get(ACTIVE_ROUTE_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored["status"], "completed");
    assert_eq!(stored["startNode"], "B");

    // Clear
    manager.clear().unwrap();
    assert_eq!(manager.state().unwrap(), SessionState::NoSession);
    assert!(!backend.contains(ACTIVE_ROUTE_KEY).unwrap());
    assert!(backend.contains(ROUTE_HISTORY_KEY).unwrap());
}

#[test]
fn test_scan_after_completion_starts_new_session() {
    let (mut manager, clock, _) = manager();
    let a = decode(r#"{"n":"A","b":"BLDG","f":1}"#).unwrap();
    manager.on_scan(&a, Some("NODE_DEST")).unwrap();
    manager.complete().unwrap();

    clock.advance(5_000);
    let transition = manager.on_scan(&a, Some("CAFE")).unwrap();
    assert!(matches!(transition, ScanTransition::Restarted(_)));

    let history = manager.history().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].end.as_str(), "CAFE");
    assert!(!history[0].completed);
    assert!(history[1].completed);
}

#[test]
fn test_clear_active_abandons_entry() {
    let (mut manager, _, _) = manager();
    let a = decode("direction://node?nodeId=A&building=BLDG").unwrap();
    manager.on_scan(&a, Some("NODE_DEST")).unwrap();
    manager.clear().unwrap();

    assert_eq!(manager.state().unwrap(), SessionState::NoSession);
    assert!(!manager.history().unwrap()[0].completed);
}

#[test]
fn test_session_survives_restart() {
    let (mut manager, _, backend) = manager();
    let a = decode(r#"{"n":"A","b":"BLDG","f":1}"#).unwrap();
    manager.on_scan(&a, Some("NODE_DEST")).unwrap();
    drop(manager);

    let restarted = SessionManager::new(Box::new(backend));
    let state = restarted.state().unwrap();
    assert!(state.is_active());
    assert_eq!(state.route().unwrap().end_node.as_str(), "NODE_DEST");
}

#[test]
fn test_reads_records_written_by_other_clients() {
    let mut backend = MemoryBackend::new();
    backend
        .set(
            ACTIVE_ROUTE_KEY,
            r#"{"startNode":"A","endNode":"NODE_DEST","lastUpdated":1700000000000,"status":"active"}"#,
        )
        .unwrap();
    backend
        .set(
            ROUTE_HISTORY_KEY,
            r#"[{"start":"A","end":"NODE_DEST","completed":false,"timestamp":1700000000000}]"#,
        )
        .unwrap();

    let mut manager = SessionManager::new(Box::new(backend)).with_clock(ManualClock::new(1_700_000_100_000));
    let route = manager.complete().unwrap();
    assert_eq!(route.last_updated, 1_700_000_100_000);
    assert!(manager.history().unwrap()[0].completed);
}
