//! Integration test for map and session persistence on RocksDB.

use etigah_nav::session::ManualClock;
use etigah_nav::{
    decode, FloorGraph, Navigator, NavigatorConfig, Position, RocksDBBackend, RouteView,
    SessionManager, SessionState,
};
use tempfile::TempDir;

#[test]
fn test_map_persists_across_reopens() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("campus.map");

    {
        let mut graph = FloorGraph::open(&db_path).unwrap();
        let a = graph.add_node(Position::new(1.0, 1.0), "BLDG_A", 1).unwrap();
        let b = graph.add_node(Position::new(2.0, 1.0), "BLDG_A", 1).unwrap();
        let c = graph.add_node(Position::new(2.0, 1.0), "BLDG_A", 2).unwrap();
        graph.add_edge(&a, &b).unwrap();
        graph.add_edge(&b, &c).unwrap();
        graph.remove_node(&c).unwrap();
        graph.close().unwrap();
    }

    {
        let mut graph = FloorGraph::open(&db_path).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.find_route("node-0", "node-1").is_some());

        // node-2 was removed but is not reissued
        let id = graph.add_node(Position::new(0.0, 0.0), "BLDG_A", 1).unwrap();
        assert_eq!(id.as_str(), "node-3");
    }
}

#[test]
fn test_session_and_map_share_one_database() {
    let temp_dir = TempDir::new().unwrap();
    let backend = RocksDBBackend::open(temp_dir.path().join("device.db")).unwrap();

    {
        let mut graph = FloorGraph::with_backend(Box::new(backend.clone())).unwrap();
        let a = graph.add_node(Position::new(0.0, 0.0), "BLDG_A", 1).unwrap();
        let dest = graph.add_node(Position::new(9.0, 0.0), "BLDG_A", 1).unwrap();
        graph.add_edge(&a, &dest).unwrap();

        let mut sessions = SessionManager::new(Box::new(backend.clone()))
            .with_clock(ManualClock::new(1_700_000_000_000));
        let payload = decode(r#"{"n":"node-0","b":"BLDG_A","f":1}"#).unwrap();
        sessions.on_scan(&payload, Some(dest.as_str())).unwrap();
        sessions.flush().unwrap();
    }

    // After a restart the session and map are both back
    let graph = FloorGraph::with_backend(Box::new(backend.clone())).unwrap();
    let sessions = SessionManager::new(Box::new(backend.clone()));
    assert!(matches!(sessions.state().unwrap(), SessionState::Active(_)));
    assert_eq!(sessions.history().unwrap().len(), 1);

    let navigator = Navigator::new(NavigatorConfig::default(), Box::new(backend));
    let RouteView::Path { path, .. } = navigator.current_route(&graph).unwrap() else {
        panic!("expected a route");
    };
    assert_eq!(path.len(), 2);
}
