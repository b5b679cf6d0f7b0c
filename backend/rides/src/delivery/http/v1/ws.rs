use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::session::Session;
use crate::usecase::feed::{FeedEvent, FeedFilter};
use crate::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    token: String,
}

/// Live view of one conversation thread. New messages are pushed as they are
/// committed, and text frames from the client are sent as messages.
pub async fn conversation_ws_handler(
    ws: WebSocketUpgrade,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let session = match state.jwt_service.session_from_token(&query.token) {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(
                conversation_id = %conversation_id,
                error = %e,
                "WS connection rejected: invalid token"
            );
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    };

    if let Err(e) = state
        .messaging_usecase
        .get_conversation(session.user_id, conversation_id)
        .await
    {
        tracing::warn!(
            conversation_id = %conversation_id,
            user_id = %session.user_id,
            error = %e,
            "WS connection rejected"
        );
        return e.into_response();
    }

    tracing::info!(
        conversation_id = %conversation_id,
        user_id = %session.user_id,
        "WS connection accepted, upgrading"
    );

    ws.on_upgrade(move |socket| handle_socket(socket, conversation_id, session, state))
}

async fn handle_socket(socket: WebSocket, conversation_id: Uuid, session: Session, state: Arc<AppState>) {
    let user_id = session.user_id;
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let events = state.feed.subscribe(FeedFilter::Conversation(conversation_id));
    tokio::pin!(events);

    tracing::info!(
        conversation_id = %conversation_id,
        user_id = %user_id,
        "WS client connected"
    );

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else {
                    tracing::debug!(conversation_id = %conversation_id, "feed closed");
                    break;
                };

                let incoming = matches!(&event, FeedEvent::MessagePosted { message, .. } if message.sender_id != user_id);
                let payload = serde_json::to_string(&event).unwrap_or_default();

                if ws_sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    tracing::info!(
                        conversation_id = %conversation_id,
                        user_id = %user_id,
                        "WS send failed, client disconnected"
                    );
                    break;
                }

                // The reader is looking at the thread, so anything pushed to them is read.
                if incoming {
                    if let Err(e) = state.messaging_usecase.mark_read(user_id, conversation_id).await {
                        tracing::warn!(error = %e, "failed to mark pushed message read");
                    }
                }
            }
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        match state
                            .messaging_usecase
                            .send_message(user_id, conversation_id, text.as_str())
                            .await
                        {
                            Ok(_) => {
                                metrics::counter!("messages_sent_total", "channel" => "ws").increment(1);
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "WS message rejected");
                                let error = json!({ "type": "error", "error": e.to_string() }).to_string();
                                if ws_sender.send(WsMessage::Text(error.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        tracing::info!(
                            conversation_id = %conversation_id,
                            user_id = %user_id,
                            "WS client disconnected"
                        );
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(
                            conversation_id = %conversation_id,
                            user_id = %user_id,
                            error = %e,
                            "WS receive error"
                        );
                        break;
                    }
                    // Ping/Pong are handled by axum; binary frames are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
