/**
 * Application State Management
 *
 * This module defines the application state structure shared by every
 * handler.
 *
 * # Architecture
 *
 * `AppState` is the central state container, holding:
 * - The delivery group registry (real-time broadcast capability)
 * - The message store (persistence contract)
 *
 * The broadcast capability is injected into each connection handler through
 * this state at construction time; there is no global broadcaster holder
 * and no runtime "not yet initialized" guard.
 *
 * # Thread Safety
 *
 * All state is designed to be thread-safe: the group registry is internally
 * synchronized and the store is an `Arc<dyn MessageStore>` whose
 * implementations coordinate themselves (or need no coordination at all —
 * the persistence contract is append-only/monotonic).
 */
use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::persistence::MessageStore;
use crate::backend::relay::DeliveryGroups;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Per-user delivery groups for real-time fan-out
    pub groups: DeliveryGroups,
    /// Durable message store shared by the relay and the REST surface
    pub store: Arc<dyn MessageStore>,
}

impl AppState {
    /// Build state over the given store with a fresh group registry
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            groups: DeliveryGroups::new(),
            store,
        }
    }
}

impl FromRef<AppState> for DeliveryGroups {
    fn from_ref(state: &AppState) -> Self {
        state.groups.clone()
    }
}
