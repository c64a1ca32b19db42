//! Backend Module
//!
//! This module contains all server-side code for the synchronization core:
//! an Axum server exposing the authenticated WebSocket relay and the REST
//! collaborator surface over a shared persistence contract.
//!
//! # Architecture
//!
//! The backend is organized into focused submodules:
//!
//! - **`server`** - Server initialization, application state, configuration
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`relay`** - Delivery groups and the WebSocket connection handler
//! - **`persistence`** - The message store contract and its implementations
//! - **`auth`** - Bearer-credential verification at the handshake
//! - **`error`** - Backend-specific error types
//!
//! # State Management
//!
//! Handlers share an `AppState` holding the delivery-group registry and the
//! message store. There is no per-conversation in-memory state: every event
//! handler re-derives truth from persistence, so overlapping handlers have
//! nothing to lock.

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Delivery groups and the WebSocket relay
pub mod relay;

/// Message persistence contract and implementations
pub mod persistence;

/// Connection authentication
pub mod auth;

/// Backend error types
pub mod error;

/// Re-export commonly used types
pub use error::BackendError;
pub use persistence::MessageStore;
pub use relay::DeliveryGroups;
pub use server::{create_app, AppState};
