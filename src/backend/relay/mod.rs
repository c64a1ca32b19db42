//! Connection Relay
//!
//! The server-side real-time path: per-user delivery groups and the
//! WebSocket connection handler that authenticates, persists, and
//! re-broadcasts events. Broadcasting is capability-based — handlers reach
//! the groups through the application state they are constructed with, not
//! through any global holder.

/// Per-user delivery groups ("rooms")
pub mod groups;

/// WebSocket upgrade, event loop, and event dispatch
pub mod connection;

pub use connection::{dispatch, ws_handler};
pub use groups::DeliveryGroups;
