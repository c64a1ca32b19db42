/**
 * Message REST Handlers
 *
 * The collaborator REST surface around the real-time core. These handlers
 * operate on the same Message entity and the same persistence contract as
 * the relay, which is what keeps the two paths consistent: a message
 * created here is visible to the history backfill a reconnecting client
 * performs, and vice versa.
 *
 * Unlike the relay path, validation failures here are explicit error
 * responses (400), and persistence failures surface as server errors (500).
 */
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::auth::AuthUser;
use crate::backend::error::BackendError;
use crate::backend::persistence::MessageStore;
use crate::backend::server::state::AppState;
use crate::shared::message::{validate_content, Message};

/// Request body for creating a message
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
}

/// Pagination parameters for message listings
#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
}

/// Count of records touched by a seen flip
#[derive(Debug, Serialize)]
pub struct SeenResponse {
    pub modified: u64,
}

/// Total unseen messages for the authenticated user
#[derive(Debug, Serialize)]
pub struct UnseenCountResponse {
    pub count: i64,
}

/// Create a message (POST /messages)
///
/// The REST twin of the relay's `send_message`: same validation, same
/// persistence. Delivery to connected sessions is the relay's job; this
/// endpoint only makes the record durable.
pub async fn create_message(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(request): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<Message>), BackendError> {
    let content = validate_content(&request.content)?;
    let message = state.store.create(me, request.receiver_id, &content).await?;

    tracing::debug!(sender = %me, recipient = %request.receiver_id, "message created over REST");
    Ok((StatusCode::CREATED, Json(message)))
}

/// List the authenticated user's messages (GET /messages)
///
/// Everything sent or received by the caller, oldest first; `?limit=` caps
/// the result. This is the bulk-history path a reconnecting client uses to
/// recover messages the real-time channel never replays.
pub async fn list_messages(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Message>>, BackendError> {
    let messages = state.store.messages_for_user(me, pagination.limit).await?;
    Ok(Json(messages))
}

/// Total unseen messages addressed to the caller (GET /messages/unseen)
pub async fn unseen_count(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<Json<UnseenCountResponse>, BackendError> {
    let count = state.store.unseen_count(me).await?;
    Ok(Json(UnseenCountResponse { count }))
}

/// Fetch one conversation (GET /conversations/{other_id})
///
/// Both directions between the caller and `other_id`, oldest first.
pub async fn get_conversation(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(other_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, BackendError> {
    let messages = state.store.conversation(me, other_id).await?;
    Ok(Json(messages))
}

/// Mark a sender's messages to the caller as seen (POST /messages/seen/{sender_id})
///
/// The REST twin of the relay's `seen` event; idempotent, returns how many
/// records were flipped (0 on a repeat call).
pub async fn mark_seen(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(sender_id): Path<Uuid>,
) -> Result<Json<SeenResponse>, BackendError> {
    let modified = state.store.mark_as_seen(sender_id, me).await?;
    Ok(Json(SeenResponse { modified }))
}
