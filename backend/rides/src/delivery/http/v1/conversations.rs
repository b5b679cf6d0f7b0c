use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::conversation::{Conversation, LastMessage, ParticipantDetails};
use crate::domain::message::Message;
use crate::domain::session::Session;
use crate::usecase::error::UsecaseError;
use crate::AppState;

/// A conversation as seen by one participant.
#[derive(Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub participant_ids: Vec<Uuid>,
    pub participant_details: HashMap<Uuid, ParticipantDetails>,
    pub last_message: Option<LastMessage>,
    pub unread_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ThreadResponse {
    pub conversation: ConversationResponse,
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

pub fn conversation_to_response(conversation: Conversation, viewer_id: Uuid) -> ConversationResponse {
    ConversationResponse {
        unread_count: conversation.unread_for(viewer_id),
        id: conversation.id,
        participant_ids: conversation.participant_ids,
        participant_details: conversation.participant_details,
        last_message: conversation.last_message,
        created_at: conversation.created_at,
    }
}

#[tracing::instrument(skip(state), fields(user_id = %session.user_id))]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling inbox request");

    let conversations = state.messaging_usecase.inbox(session.user_id).await?;
    let response: Vec<ConversationResponse> = conversations
        .into_iter()
        .map(|c| conversation_to_response(c, session.user_id))
        .collect();

    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip(state), fields(user_id = %session.user_id, %conversation_id))]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    let conversation = state
        .messaging_usecase
        .get_conversation(session.user_id, conversation_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(conversation_to_response(conversation, session.user_id)),
    ))
}

#[tracing::instrument(skip(state), fields(user_id = %session.user_id, %conversation_id))]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    let (conversation, messages) = state
        .messaging_usecase
        .open_thread(session.user_id, conversation_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ThreadResponse {
            conversation: conversation_to_response(conversation, session.user_id),
            messages,
        }),
    ))
}

#[tracing::instrument(skip(state, payload), fields(user_id = %session.user_id, %conversation_id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(validation_errors.to_string()));
    }

    let message = state
        .messaging_usecase
        .send_message(session.user_id, conversation_id, &payload.text)
        .await?;

    metrics::counter!("messages_sent_total", "channel" => "http").increment(1);
    Ok((StatusCode::CREATED, Json(message)))
}

#[tracing::instrument(skip(state), fields(user_id = %session.user_id, %conversation_id))]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    state
        .messaging_usecase
        .mark_read(session.user_id, conversation_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_carries_viewer_unread_count() {
        let rider = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let details = |name: &str| ParticipantDetails {
            display_name: name.to_string(),
            avatar_url: String::new(),
        };
        let mut conversation = Conversation::between((rider, details("Me")), (driver, details("Ravi")));
        let message = Message::new(conversation.id, rider, "hello".to_string());
        conversation.last_message = Some(LastMessage::from(&message));
        conversation.unread_counts.insert(driver, 1);

        assert_eq!(conversation_to_response(conversation.clone(), driver).unread_count, 1);
        assert_eq!(conversation_to_response(conversation, rider).unread_count, 0);
    }
}
