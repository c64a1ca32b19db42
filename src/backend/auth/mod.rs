/**
 * Connection Authentication
 *
 * This module validates the bearer credential supplied when a connection is
 * established, for both the WebSocket handshake and the REST surface. On
 * success the resolved user identifier is attached to the connection; on
 * failure the connection is refused before any event is processed.
 *
 * Credential *issuance* is an external collaborator (the registration/login
 * flow) — this module only verifies tokens it is handed.
 */
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Get JWT secret from environment
fn get_jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("Missing JWT_SECRET, using development fallback");
        "pairchat-dev-secret-change-in-production".to_string()
    })
}

/// Create a JWT token for a user
///
/// Issuance lives outside this core; this helper exists for the collaborator
/// login flow and for tests that need to mint a valid handshake credential.
///
/// # Arguments
/// * `user_id` - User ID (UUID)
///
/// # Returns
/// JWT token string
pub fn create_token(user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs();

    // Token expires in 30 days
    let exp = now + (30 * 24 * 60 * 60);

    let claims = Claims {
        sub: user_id.to_string(),
        exp,
        iat: now,
    };

    let secret = get_jwt_secret();
    let key = EncodingKey::from_secret(secret.as_ref());

    encode(&Header::default(), &claims, &key)
}

/// Verify and decode a JWT token
///
/// # Arguments
/// * `token` - JWT token string
///
/// # Returns
/// Decoded claims or error
pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let secret = get_jwt_secret();
    let key = DecodingKey::from_secret(secret.as_ref());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &key, &validation)?;
    Ok(token_data.claims)
}

/// Resolve the connecting user from handshake credentials
///
/// Accepts the bearer token from the `Authorization` header, or — for
/// browser WebSocket clients that cannot set headers on the upgrade request
/// — from a `token` query parameter. Absence or invalidity of both refuses
/// the connection before the event loop starts.
pub fn authenticate_handshake(
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<Uuid, BackendError> {
    let header_token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let token = header_token
        .or(query_token)
        .ok_or_else(|| BackendError::auth("missing bearer credential"))?;

    let claims =
        verify_token(token).map_err(|e| BackendError::auth(format!("invalid token: {}", e)))?;

    Uuid::parse_str(&claims.sub)
        .map_err(|e| BackendError::auth(format!("invalid user ID in token: {}", e)))
}

/// Axum extractor for the authenticated user on the REST surface
///
/// Verifies the `Authorization: Bearer <token>` header and yields the
/// resolved user id. Handlers take `AuthUser(user_id)` as a parameter;
/// requests without a valid credential are rejected with 401.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Uuid);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match authenticate_handshake(&parts.headers, None) {
            Ok(user_id) => Ok(AuthUser(user_id)),
            Err(e) => {
                tracing::warn!(error = %e, "rejected unauthenticated request");
                Err(StatusCode::UNAUTHORIZED)
            }
        }
    }
}
