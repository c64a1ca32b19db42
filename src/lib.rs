//! PairChat - Message Synchronization Core
//!
//! PairChat is the synchronization core of a one-to-one real-time chat
//! application: the protocol and state-reconciliation logic that keep an
//! optimistic client-side message log consistent with an authoritative
//! server-persisted log, across unreliable, concurrent, multi-session
//! delivery.
//!
//! # Module Structure
//!
//! The library is organized into three main modules:
//!
//! - **`shared`** - Types shared between client and server
//!   - The Message record and its pure reconciliation merge
//!   - The wire event envelope (send/typing/seen plus ack/nack)
//!   - Conversation keys and shared error types
//!
//! - **`client`** - Client-side message store
//!   - Ordered, deduplicating log with optimistic-send reconciliation
//!   - Scoped read-receipt mutators and per-conversation typing slots
//!
//! - **`backend`** - Server-side relay
//!   - Bearer-authenticated WebSocket connections
//!   - Per-user delivery groups with multi-session fan-out
//!   - Message persistence contract (PostgreSQL and in-memory stores)
//!   - REST collaborator surface over the same persistence
//!
//! # Control Flow
//!
//! A client action or inbound relay event drives a
//! [`client::ClientMessageStore`] mutator, and the UI reads derived state. A
//! client send travels relay → persistence → relay broadcast → the remote
//! party's store mutator.

/// Types shared between client and server
pub mod shared;

/// Client-side message store
pub mod client;

/// Server-side relay, persistence, and REST surface
pub mod backend;
