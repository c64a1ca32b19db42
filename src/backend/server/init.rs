/**
 * Server Initialization
 *
 * This module handles the initialization and setup of the Axum HTTP
 * server: store selection, state creation, and route configuration.
 *
 * # Initialization Process
 *
 * 1. Load the optional database and pick the message store
 * 2. Create the application state (delivery groups + store)
 * 3. Create and configure the router
 * 4. Start the periodic delivery-group sweep task
 *
 * # Error Handling
 *
 * The function is designed to be resilient: a missing database means the
 * server runs on the in-memory store instead of refusing to start.
 */
use std::sync::Arc;

use axum::Router;

use crate::backend::persistence::{InMemoryMessageStore, MessageStore, PostgresMessageStore};
use crate::backend::routes::create_router;
use crate::backend::server::config::load_database;
use crate::backend::server::state::AppState;

/// How often empty delivery groups are reclaimed
const GROUP_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

/// Create and configure the Axum application
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
pub async fn create_app() -> Router {
    tracing::info!("Initializing relay server");

    // Step 1: Pick the message store.
    let store: Arc<dyn MessageStore> = match load_database().await {
        Some(pool) => Arc::new(PostgresMessageStore::new(pool)),
        None => Arc::new(InMemoryMessageStore::new()),
    };

    // Step 2: Create shared state. The delivery-group registry starts empty;
    // groups appear as connections join.
    let state = AppState::new(store);

    tracing::info!("Application state initialized");

    // Step 3: Periodically reclaim groups whose sessions have all gone.
    let groups = state.groups.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(GROUP_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            groups.sweep();
            tracing::debug!(remaining = groups.group_count(), "swept delivery groups");
        }
    });

    // Step 4: Create router with all routes.
    create_router(state)
}
