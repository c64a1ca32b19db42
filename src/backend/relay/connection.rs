/**
 * Connection Relay
 *
 * This module implements the WebSocket endpoint of the real-time path: the
 * authenticated upgrade, the per-connection event loop, and the dispatch of
 * client events onto persistence and delivery groups.
 *
 * # Handshake
 *
 * The bearer credential is validated *before* the upgrade completes. An
 * unauthenticated connection is refused with 401 — it is never accepted
 * into the event loop and later torn down.
 *
 * # Event Loop
 *
 * Each connection runs a single select loop over two sources: frames
 * arriving from the client, and events arriving from the user's delivery
 * group. Every relay event handler re-derives truth from persistence; there
 * is no shared per-conversation state and therefore nothing to lock.
 *
 * # Acknowledgement
 *
 * `send_message` is answered on the originating connection with `ack` or
 * `nack` (correlated by the client-supplied `client_id`), so a dropped send
 * is observable and retriable instead of silently vanishing. Ephemeral and
 * idempotent events stay fire-and-forget.
 */
use std::collections::HashMap;

use axum::extract::ws::{Message as WsFrame, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::backend::auth;
use crate::backend::persistence::MessageStore;
use crate::backend::server::state::AppState;
use crate::shared::event::{ClientEvent, ServerEvent};
use crate::shared::message::validate_content;

/// Handle a WebSocket upgrade request (GET /ws)
///
/// The credential comes from the `Authorization` header or, for browser
/// clients, a `token` query parameter. Only an authenticated request is
/// upgraded.
pub async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id =
        match auth::authenticate_handshake(&headers, params.get("token").map(String::as_str)) {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::warn!(error = %e, "refused unauthenticated connection");
                return StatusCode::UNAUTHORIZED.into_response();
            }
        };

    ws.on_upgrade(move |socket| handle_connection(socket, state, user_id))
}

/// Run one authenticated connection until it closes
///
/// Joining the delivery group is idempotent: several simultaneous sessions
/// of the same user all subscribe to the same group, and the group is the
/// only session bookkeeping that exists.
pub async fn handle_connection(socket: WebSocket, state: AppState, user_id: Uuid) {
    tracing::info!(%user_id, "connection joined delivery group");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut group_rx = state.groups.join(user_id);

    loop {
        tokio::select! {
            inbound = ws_rx.next() => {
                let Some(Ok(frame)) = inbound else { break };
                match frame {
                    WsFrame::Text(text) => {
                        let event = match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => event,
                            Err(e) => {
                                tracing::warn!(%user_id, error = %e, "dropping unparseable frame");
                                continue;
                            }
                        };

                        if let Some(reply) = dispatch(&state, user_id, event).await {
                            if send_event(&mut ws_tx, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    WsFrame::Close(_) => break,
                    // Ping/pong are handled by axum; binary frames are not
                    // part of the protocol.
                    _ => {}
                }
            }
            outbound = group_rx.recv() => {
                match outbound {
                    Ok(event) => {
                        if send_event(&mut ws_tx, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Dropped events are recovered through the REST
                        // history path, the same as a reconnect.
                        tracing::warn!(%user_id, skipped, "session lagged behind its group");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::info!(%user_id, "connection left delivery group");
}

async fn send_event(
    ws_tx: &mut (impl futures_util::Sink<WsFrame> + Unpin),
    event: &ServerEvent,
) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize outbound event");
            return Ok(());
        }
    };
    ws_tx.send(WsFrame::Text(json.into())).await.map_err(|_| ())
}

/// Apply one client event: persist, broadcast, and build the reply
///
/// Returns the `ack`/`nack` addressed to the originating connection, if the
/// event warrants one. Group broadcasts happen inside; the caller only
/// forwards the reply.
pub async fn dispatch(state: &AppState, sender: Uuid, event: ClientEvent) -> Option<ServerEvent> {
    match event {
        ClientEvent::SendMessage {
            receiver_id,
            content,
            client_id,
        } => {
            let content = match validate_content(&content) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(%sender, error = %e, "dropping invalid send");
                    return Some(ServerEvent::nack(client_id, e.to_string()));
                }
            };

            match state.store.create(sender, receiver_id, &content).await {
                Ok(mut persisted) => {
                    // The echo carries the correlation token so the sender's
                    // other sessions (and its own optimistic record) can
                    // reconcile; the token is not persisted.
                    persisted.client_id = client_id;
                    state.groups.broadcast_to(
                        &[receiver_id, sender],
                        ServerEvent::receive_message(persisted.clone()),
                    );
                    client_id.map(|client_id| ServerEvent::Ack {
                        client_id,
                        message: persisted,
                    })
                }
                Err(e) => {
                    tracing::error!(%sender, error = %e, "failed to persist message");
                    Some(ServerEvent::nack(client_id, "message could not be stored"))
                }
            }
        }

        ClientEvent::Typing { receiver_id } => {
            // Ephemeral: delivered to the receiver's group only, never
            // persisted, lost if the receiver is offline.
            state
                .groups
                .broadcast(receiver_id, ServerEvent::Typing { user_id: sender });
            None
        }

        ClientEvent::StopTyping { receiver_id } => {
            state
                .groups
                .broadcast(receiver_id, ServerEvent::StopTyping { user_id: sender });
            None
        }

        ClientEvent::Seen { receiver_id } => {
            match state.store.mark_as_seen(receiver_id, sender).await {
                Ok(modified) => {
                    tracing::debug!(%sender, %receiver_id, modified, "marked messages seen");
                    state.groups.broadcast_to(
                        &[sender, receiver_id],
                        ServerEvent::Seen {
                            reader_id: sender,
                            sender_id: receiver_id,
                        },
                    );
                }
                Err(e) => {
                    // Seen carries no correlation token; the flip is
                    // idempotent and will be retried by the next receipt.
                    tracing::error!(%sender, error = %e, "failed to persist seen flip");
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::persistence::InMemoryMessageStore;
    use crate::backend::server::state::AppState;
    use std::sync::Arc;

    fn user(n: u8) -> Uuid {
        Uuid::from_u128(n as u128)
    }

    fn test_state() -> AppState {
        AppState::new(Arc::new(InMemoryMessageStore::new()))
    }

    fn send_event(receiver: Uuid, content: &str, client_id: Option<Uuid>) -> ClientEvent {
        ClientEvent::SendMessage {
            receiver_id: receiver,
            content: content.to_string(),
            client_id,
        }
    }

    #[tokio::test]
    async fn test_send_message_persists_broadcasts_and_acks() {
        let state = test_state();
        let mut receiver_session = state.groups.join(user(2));
        let mut sender_session = state.groups.join(user(1));
        let client_id = Uuid::new_v4();

        let reply = dispatch(&state, user(1), send_event(user(2), " hi ", Some(client_id))).await;

        // Ack carries the persisted record, correlated by client_id.
        match reply {
            Some(ServerEvent::Ack {
                client_id: acked,
                message,
            }) => {
                assert_eq!(acked, client_id);
                assert!(message.id.is_some());
                assert_eq!(message.content, "hi");
            }
            other => panic!("expected ack, got {:?}", other),
        }

        // Both groups get the echo, client_id included.
        for session in [&mut receiver_session, &mut sender_session] {
            match session.recv().await.unwrap() {
                ServerEvent::ReceiveMessage(message) => {
                    assert_eq!(message.client_id, Some(client_id));
                    assert_eq!(message.sender, user(1));
                    assert_eq!(message.recipient, user(2));
                }
                other => panic!("expected receive_message, got {:?}", other),
            }
        }

        // And the record is durable.
        let stored = state.store.conversation(user(1), user(2)).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].client_id.is_none(), "correlation token not persisted");
    }

    #[tokio::test]
    async fn test_send_message_empty_content_is_nacked_not_persisted() {
        let state = test_state();
        let mut receiver_session = state.groups.join(user(2));
        let client_id = Uuid::new_v4();

        let reply = dispatch(&state, user(1), send_event(user(2), "   ", Some(client_id))).await;

        match reply {
            Some(ServerEvent::Nack {
                client_id: nacked, ..
            }) => assert_eq!(nacked, Some(client_id)),
            other => panic!("expected nack, got {:?}", other),
        }

        assert!(state
            .store
            .conversation(user(1), user(2))
            .await
            .unwrap()
            .is_empty());
        assert!(receiver_session.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_without_client_id_broadcasts_without_ack() {
        let state = test_state();
        let mut receiver_session = state.groups.join(user(2));

        let reply = dispatch(&state, user(1), send_event(user(2), "hi", None)).await;
        assert!(reply.is_none());

        match receiver_session.recv().await.unwrap() {
            ServerEvent::ReceiveMessage(message) => assert!(message.client_id.is_none()),
            other => panic!("expected receive_message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_self_send_delivers_once_per_session() {
        let state = test_state();
        let mut session = state.groups.join(user(1));

        dispatch(&state, user(1), send_event(user(1), "note to self", None)).await;

        session.recv().await.unwrap();
        assert!(session.try_recv().is_err(), "no duplicate delivery");
    }

    #[tokio::test]
    async fn test_typing_is_not_persisted_and_reaches_receiver_only() {
        let state = test_state();
        let mut receiver_session = state.groups.join(user(2));
        let mut sender_session = state.groups.join(user(1));

        let reply = dispatch(&state, user(1), ClientEvent::Typing { receiver_id: user(2) }).await;
        assert!(reply.is_none());

        assert_eq!(
            receiver_session.recv().await.unwrap(),
            ServerEvent::Typing { user_id: user(1) }
        );
        assert!(sender_session.try_recv().is_err(), "sender group untouched");
        assert!(state
            .store
            .conversation(user(1), user(2))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_stop_typing_reaches_receiver_only() {
        let state = test_state();
        let mut receiver_session = state.groups.join(user(2));

        dispatch(
            &state,
            user(1),
            ClientEvent::StopTyping { receiver_id: user(2) },
        )
        .await;

        assert_eq!(
            receiver_session.recv().await.unwrap(),
            ServerEvent::StopTyping { user_id: user(1) }
        );
    }

    #[tokio::test]
    async fn test_seen_flips_persistence_and_notifies_both_groups() {
        let state = test_state();
        state.store.create(user(2), user(1), "hello").await.unwrap();

        let mut reader_session = state.groups.join(user(1));
        let mut author_session = state.groups.join(user(2));

        // u1 reports having read everything u2 sent them.
        let reply = dispatch(&state, user(1), ClientEvent::Seen { receiver_id: user(2) }).await;
        assert!(reply.is_none());

        let expected = ServerEvent::Seen {
            reader_id: user(1),
            sender_id: user(2),
        };
        assert_eq!(reader_session.recv().await.unwrap(), expected);
        assert_eq!(author_session.recv().await.unwrap(), expected);

        let stored = state.store.conversation(user(1), user(2)).await.unwrap();
        assert!(stored[0].seen);
        assert_eq!(state.store.mark_as_seen(user(2), user(1)).await.unwrap(), 0);
    }
}
