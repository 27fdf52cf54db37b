//! Route session lifecycle.
//!
//! A device follows at most one route at a time. The session is started by
//! scanning a marker, recalibrated by scanning further markers on the way,
//! and completed when the destination is reached. It survives restarts
//! through the [`StorageBackend`](crate::storage::StorageBackend) it is
//! stored in:
//!
//! - `activeRoute`: `{"startNode","endNode","lastUpdated","status"}`
//! - `routeHistory`: most-recent-first list of `{"start","end","completed","timestamp"}`

mod clock;
mod manager;
mod record;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{SessionManager, ACTIVE_ROUTE_KEY, DEFAULT_HISTORY_LIMIT, ROUTE_HISTORY_KEY};
pub use record::{ActiveRoute, RouteHistoryEntry, RouteStatus, ScanTransition, SessionState};
