//! Whole-map snapshots for backup, restore and hand-off to other tools.
//!
//! The JSON shape is `{"nodes": [...], "edges": [...]}`, the same data a map
//! version backup stores.

pub mod json;

pub use json::{export_json, import_json, GraphSnapshot};
