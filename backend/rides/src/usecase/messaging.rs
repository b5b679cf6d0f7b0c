use uuid::Uuid;

use crate::domain::conversation::Conversation;
use crate::domain::message::{Message, MAX_MESSAGE_LENGTH};
use crate::usecase::contracts::ConversationRepository;
use crate::usecase::error::UsecaseError;
use crate::usecase::feed::{ChangeFeed, FeedEvent};

pub struct MessagingUseCase<C>
where
    C: ConversationRepository,
{
    conversation_repository: C,
    feed: ChangeFeed,
}

impl<C> MessagingUseCase<C>
where
    C: ConversationRepository,
{
    pub fn new(conversation_repository: C, feed: ChangeFeed) -> Self {
        Self {
            conversation_repository,
            feed,
        }
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn inbox(&self, user_id: Uuid) -> Result<Vec<Conversation>, UsecaseError> {
        tracing::debug!("loading inbox");

        let mut conversations = self.conversation_repository.find_by_participant(user_id).await?;
        conversations.sort_by_key(|c| std::cmp::Reverse(c.last_activity()));

        tracing::debug!(count = conversations.len(), "inbox loaded");
        Ok(conversations)
    }

    /// Conversations are invisible to anyone outside them, so a stranger gets
    /// the same answer as for a missing id.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, conversation_id = %conversation_id))]
    pub async fn get_conversation(&self, user_id: Uuid, conversation_id: Uuid) -> Result<Conversation, UsecaseError> {
        let conversation = self
            .conversation_repository
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Conversation".to_string()))?;

        if !conversation.is_participant(user_id) {
            tracing::warn!("conversation requested by non-participant");
            return Err(UsecaseError::NotFound("Conversation".to_string()));
        }
        Ok(conversation)
    }

    /// Loads the thread in send order and clears the caller's unread counter.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, conversation_id = %conversation_id))]
    pub async fn open_thread(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<(Conversation, Vec<Message>), UsecaseError> {
        let mut conversation = self.get_conversation(user_id, conversation_id).await?;
        let messages = self.conversation_repository.find_messages(conversation_id).await?;

        if conversation.unread_for(user_id) > 0 {
            self.mark_read_unchecked(&mut conversation, user_id).await?;
        }

        tracing::debug!(count = messages.len(), "thread opened");
        Ok((conversation, messages))
    }

    #[tracing::instrument(skip(self, text), fields(sender_id = %sender_id, conversation_id = %conversation_id))]
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        conversation_id: Uuid,
        text: &str,
    ) -> Result<Message, UsecaseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(UsecaseError::Validation("Message cannot be empty".to_string()));
        }
        if text.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(UsecaseError::Validation(format!(
                "Message cannot be longer than {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }

        let conversation = self.get_conversation(sender_id, conversation_id).await?;
        let recipient_id = conversation.other_participant(sender_id).ok_or_else(|| {
            UsecaseError::Validation("Conversation has no other participant".to_string())
        })?;

        let message = Message::new(conversation.id, sender_id, text.to_string());
        self.conversation_repository
            .append_message(&message, recipient_id)
            .await?;

        self.feed.publish(FeedEvent::MessagePosted {
            participant_ids: conversation.participant_ids.clone(),
            message: message.clone(),
        });

        tracing::info!(message_id = %message.id, %recipient_id, "message sent");
        Ok(message)
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id, conversation_id = %conversation_id))]
    pub async fn mark_read(&self, user_id: Uuid, conversation_id: Uuid) -> Result<(), UsecaseError> {
        let mut conversation = self.get_conversation(user_id, conversation_id).await?;
        self.mark_read_unchecked(&mut conversation, user_id).await
    }

    async fn mark_read_unchecked(&self, conversation: &mut Conversation, user_id: Uuid) -> Result<(), UsecaseError> {
        self.conversation_repository
            .reset_unread(conversation.id, user_id)
            .await?;
        conversation.mark_read(user_id);

        self.feed.publish(FeedEvent::ConversationRead {
            conversation_id: conversation.id,
            participant_ids: conversation.participant_ids.clone(),
            user_id,
        });

        tracing::debug!("conversation marked read");
        Ok(())
    }
}
