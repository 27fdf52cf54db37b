//! End-to-end walk through: author a two-floor map, print its markers,
//! then follow a route by scanning markers along the way.
//!
//! Run with `RUST_LOG=debug` to see the store and session logs.

use etigah_nav::qr::marker_payloads;
use etigah_nav::{
    EditorController, EditorOutcome, FloorGraph, Floorplan, Navigator, NavigatorConfig, NodeId,
    Position, RouteView, ScanOutcome,
};

fn place(editor: &mut EditorController, x: f64, y: f64) -> etigah_nav::Result<NodeId> {
    match editor.canvas_click(Position::new(x, y))? {
        EditorOutcome::NodeAdded(id) => Ok(id),
        other => panic!("canvas click did not add a node: {other:?}"),
    }
}

fn connect(editor: &mut EditorController, a: &NodeId, b: &NodeId) -> etigah_nav::Result<()> {
    editor.pointer_down_on_node(a, Position::default())?;
    editor.pointer_up();
    editor.pointer_down_on_node(b, Position::default())?;
    editor.pointer_up();
    Ok(())
}

fn show(view: &RouteView) {
    match view {
        RouteView::NoSession => println!("  (scan a marker to start)"),
        RouteView::NoRoute { start, end, .. } => println!("  no route from {start} to {end}"),
        RouteView::Path {
            path,
            status,
            level_changes,
        } => {
            let hops: Vec<&str> = path.iter().map(NodeId::as_str).collect();
            println!("  [{status:?}] {}", hops.join(" -> "));
            for change in level_changes {
                println!("    take {} from {} to {}", change.from_node, change.from, change.to);
            }
        }
    }
}

fn main() -> etigah_nav::Result<()> {
    env_logger::init();

    // Ground floor
    let mut editor = EditorController::new(FloorGraph::in_memory()?);
    editor.attach_floorplan(Floorplan::new("plans/main_1.png", "MAIN", 1))?;
    let entrance = place(&mut editor, 5.0, 50.0)?;
    let corridor = place(&mut editor, 40.0, 50.0)?;
    let stairs_down = place(&mut editor, 80.0, 50.0)?;
    connect(&mut editor, &entrance, &corridor)?;
    connect(&mut editor, &corridor, &stairs_down)?;

    // First floor on the same map
    let mut editor = EditorController::resume(
        editor.into_graph(),
        Floorplan::new("plans/main_2.png", "MAIN", 2),
    );
    let stairs_up = place(&mut editor, 80.0, 50.0)?;
    let library = place(&mut editor, 20.0, 20.0)?;
    connect(&mut editor, &stairs_down, &stairs_up)?;
    connect(&mut editor, &stairs_up, &library)?;
    let graph = editor.into_graph();

    println!("Markers to print:");
    for (id, payload) in marker_payloads(&graph) {
        println!("  {id}: {payload}");
    }

    let config = NavigatorConfig::default().with_default_destination(library.as_str());
    let mut navigator = Navigator::in_memory(config);

    println!("\nScanning at the entrance...");
    navigator.handle_scan(r#"{"n":"node-0","b":"MAIN","f":1}"#, None)?;
    show(&navigator.current_route(&graph)?);

    println!("\nScanning a torn sticker...");
    if let ScanOutcome::Unrecognized(reason) = navigator.handle_scan("{\"n\":\"node-", None)? {
        println!("  ignored: {reason}");
    }

    println!("\nScanning at the upstairs landing...");
    navigator.handle_scan("direction://node?nodeId=node-3&building=MAIN&floor=2", None)?;
    show(&navigator.current_route(&graph)?);

    println!("\nArrived.");
    navigator.complete()?;
    for entry in navigator.sessions().history()? {
        println!(
            "  {} -> {} completed={} at {}",
            entry.start, entry.end, entry.completed, entry.timestamp
        );
    }

    Ok(())
}
