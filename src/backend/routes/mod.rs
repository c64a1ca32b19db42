/**
 * Route Configuration
 *
 * This module assembles the application's routes:
 *
 * - `GET /ws` - authenticated WebSocket upgrade into the relay
 * - `POST /messages` - create a message
 * - `GET /messages` - list the caller's messages (history backfill)
 * - `GET /messages/unseen` - total unseen count for the caller
 * - `GET /conversations/{other_id}` - one conversation, both directions
 * - `POST /messages/seen/{sender_id}` - read receipt over REST
 *
 * Every route requires a bearer credential; the WebSocket route also
 * accepts it as a `token` query parameter for browser clients.
 */
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::backend::relay::ws_handler;
use crate::backend::server::state::AppState;

pub mod messages;

/// Build the application router over the given state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route(
            "/messages",
            post(messages::create_message).get(messages::list_messages),
        )
        .route("/messages/unseen", get(messages::unseen_count))
        .route("/conversations/{other_id}", get(messages::get_conversation))
        .route("/messages/seen/{sender_id}", post(messages::mark_seen))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
