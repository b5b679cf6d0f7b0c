use sqlx::{types::Json, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    domain::conversation::{Conversation, LastMessage},
    domain::message::Message,
    repository::errors::RepositoryError,
    usecase::contracts::ConversationRepository,
};

const CONVERSATION_COLUMNS: &str =
    "id, participant_ids, participant_details, unread_counts, last_message, created_at";

/// Inserts the conversation unless a row with the same id already exists. Two
/// first bookings racing on the same pair both land on one row.
pub(super) async fn insert_conversation_if_absent(
    tx: &mut Transaction<'_, Postgres>,
    conversation: &Conversation,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO conversations (id, participant_ids, participant_details, unread_counts, last_message, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO NOTHING
        "#
    )
    .bind(conversation.id)
    .bind(&conversation.participant_ids)
    .bind(Json(&conversation.participant_details))
    .bind(Json(&conversation.unread_counts))
    .bind(Json(&conversation.last_message))
    .bind(conversation.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Stores the message, moves the preview and adds one to the recipient's
/// unread counter. The counter is incremented in SQL so concurrent senders
/// never lose an update.
pub(super) async fn append_message_in(
    tx: &mut Transaction<'_, Postgres>,
    message: &Message,
    recipient_id: Uuid,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        INSERT INTO messages (id, conversation_id, sender_id, text, sent_at)
        VALUES ($1, $2, $3, $4, $5)
        "#
    )
    .bind(message.id)
    .bind(message.conversation_id)
    .bind(message.sender_id)
    .bind(&message.text)
    .bind(message.sent_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET last_message = $2,
            unread_counts = jsonb_set(
                unread_counts,
                ARRAY[$3::text],
                to_jsonb(COALESCE((unread_counts ->> $3::text)::int, 0) + 1)
            )
        WHERE id = $1
        "#
    )
    .bind(message.conversation_id)
    .bind(Json(LastMessage::from(message)))
    .bind(recipient_id.to_string())
    .execute(&mut **tx)
    .await
    .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

#[derive(Clone)]
pub struct PostgresConversationRepository {
    pool: PgPool,
}

impl PostgresConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ConversationRepository for PostgresConversationRepository {
    #[tracing::instrument(skip(self), fields(conversation_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>, RepositoryError> {
        tracing::debug!("finding conversation by id");

        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {} FROM conversations WHERE id = $1",
            CONVERSATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(conversation)
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn find_by_participant(&self, user_id: Uuid) -> Result<Vec<Conversation>, RepositoryError> {
        tracing::debug!("finding conversations by participant");

        let conversations = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            SELECT {}
            FROM conversations
            WHERE $1 = ANY(participant_ids)
            ORDER BY COALESCE((last_message ->> 'timestamp')::timestamptz, created_at) DESC
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = conversations.len(), "found conversations");
        Ok(conversations)
    }

    #[tracing::instrument(skip(self), fields(conversation_id = %conversation_id))]
    async fn find_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, RepositoryError> {
        tracing::debug!("loading messages");

        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, conversation_id, sender_id, text, sent_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY sent_at ASC, id ASC
            "#
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(messages)
    }

    #[tracing::instrument(skip(self, message), fields(conversation_id = %message.conversation_id, message_id = %message.id))]
    async fn append_message(&self, message: &Message, recipient_id: Uuid) -> Result<(), RepositoryError> {
        tracing::debug!("appending message");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        append_message_in(&mut tx, message, recipient_id).await?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!("message appended");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(conversation_id = %conversation_id, user_id = %user_id))]
    async fn reset_unread(&self, conversation_id: Uuid, user_id: Uuid) -> Result<(), RepositoryError> {
        tracing::debug!("resetting unread counter");

        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET unread_counts = jsonb_set(unread_counts, ARRAY[$2::text], '0'::jsonb)
            WHERE id = $1
            "#
        )
        .bind(conversation_id)
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
