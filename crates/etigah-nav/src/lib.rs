//! # etigah-nav
//!
//! Indoor navigation core: the map graph, QR marker localization, and the
//! route session that turns a scanned marker into a path to walk.
//!
//! ## Core Principles
//!
//! - **Markers, not GPS**: the user's position is whatever marker they scanned last
//! - **All or nothing**: every map mutation is one storage batch or no change at all
//! - **Total decoding**: scanned text is a payload or a reason, never a panic
//! - **Deterministic routes**: equal-length routes always resolve the same way
//!
//! ## Architecture
//!
//! ```text
//! Map editor / Navigation app
//!     ↓
//! EditorController      Navigator
//!     ↓                  ↓        ↓
//! FloorGraph ◀── routing    SessionManager ◀── QR codec
//!     ↓                               ↓
//! Storage Backend (memory, RocksDB) ◀─┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use etigah_nav::{FloorGraph, Navigator, NavigatorConfig, Position, RouteView};
//!
//! # fn main() -> etigah_nav::Result<()> {
//! let mut graph = FloorGraph::in_memory()?;
//! let lobby = graph.add_node(Position::new(10.0, 80.0), "BLDG_A", 1)?;
//! let cafe = graph.add_node(Position::new(60.0, 80.0), "BLDG_A", 1)?;
//! graph.add_edge(&lobby, &cafe)?;
//!
//! let mut navigator = Navigator::in_memory(NavigatorConfig::default());
//! navigator.handle_scan(r#"{"n":"node-0","b":"BLDG_A","f":1}"#, Some(cafe.as_str()))?;
//!
//! match navigator.current_route(&graph)? {
//!     RouteView::Path { path, .. } => assert_eq!(path, vec![lobby, cafe]),
//!     other => panic!("unexpected view: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod graph;
pub mod navigator;
pub mod qr;
pub mod query;
pub mod session;
pub mod storage;

// Re-export main types
pub use config::NavigatorConfig;
pub use editor::{EditorController, EditorOutcome, Floorplan, Selection};
pub use error::{MapError, Result};
pub use export::GraphSnapshot;
pub use graph::algorithms::{find_route, route};
pub use graph::{Edge, FloorGraph, Level, Node, NodeId, Position};
pub use navigator::{Navigator, RouteView, ScanOutcome};
pub use qr::{decode, encode, encode_uri, DecodeFailure, Decoded, QrCodec, QrPayload};
pub use query::NodeQuery;
pub use session::{ActiveRoute, RouteHistoryEntry, RouteStatus, SessionManager, SessionState};
#[cfg(feature = "rocksdb-backend")]
pub use storage::RocksDBBackend;
pub use storage::{MemoryBackend, StorageBackend, WriteOp};
