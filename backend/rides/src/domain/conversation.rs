use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::message::Message;

const CONVERSATION_NAMESPACE: Uuid = Uuid::from_u128(0x5f0c_8a2e_3b1d_4c7e_9a60_d2e4_1b7f_c381);

/// Id of the one conversation between two users. The pair is sorted first, so
/// `conversation_id_for(a, b) == conversation_id_for(b, a)`.
pub fn conversation_id_for(a: Uuid, b: Uuid) -> Uuid {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    let mut name = [0u8; 32];
    name[..16].copy_from_slice(low.as_bytes());
    name[16..].copy_from_slice(high.as_bytes());
    Uuid::new_v5(&CONVERSATION_NAMESPACE, &name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantDetails {
    pub display_name: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub text: String,
    pub sender_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for LastMessage {
    fn from(message: &Message) -> Self {
        Self {
            text: message.text.clone(),
            sender_id: message.sender_id,
            timestamp: message.sent_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_ids: Vec<Uuid>,
    #[sqlx(json)]
    pub participant_details: HashMap<Uuid, ParticipantDetails>,
    #[sqlx(json)]
    pub unread_counts: HashMap<Uuid, i32>,
    #[sqlx(json)]
    pub last_message: Option<LastMessage>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn between(
        (first_id, first): (Uuid, ParticipantDetails),
        (second_id, second): (Uuid, ParticipantDetails),
    ) -> Self {
        Self {
            id: conversation_id_for(first_id, second_id),
            participant_ids: vec![first_id, second_id],
            participant_details: HashMap::from([(first_id, first), (second_id, second)]),
            unread_counts: HashMap::from([(first_id, 0), (second_id, 0)]),
            last_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participant_ids.contains(&user_id)
    }

    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        if !self.is_participant(user_id) {
            return None;
        }
        self.participant_ids.iter().copied().find(|id| *id != user_id)
    }

    pub fn unread_for(&self, user_id: Uuid) -> i32 {
        self.unread_counts.get(&user_id).copied().unwrap_or(0)
    }

    pub fn mark_read(&mut self, user_id: Uuid) {
        self.unread_counts.insert(user_id, 0);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|m| m.timestamp)
            .unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(name: &str) -> ParticipantDetails {
        ParticipantDetails {
            display_name: name.to_string(),
            avatar_url: String::new(),
        }
    }

    #[test]
    fn test_conversation_id_ignores_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(conversation_id_for(a, b), conversation_id_for(b, a));
        assert_ne!(conversation_id_for(a, b), conversation_id_for(a, Uuid::new_v4()));
    }

    #[test]
    fn test_between_seeds_both_participants() {
        let rider = Uuid::new_v4();
        let driver = Uuid::new_v4();

        let conversation = Conversation::between((rider, details("Me")), (driver, details("Ravi Kumar")));

        assert_eq!(conversation.id, conversation_id_for(driver, rider));
        assert_eq!(conversation.participant_ids.len(), 2);
        assert_eq!(conversation.unread_for(rider), 0);
        assert_eq!(conversation.unread_for(driver), 0);
        assert_eq!(conversation.participant_details[&driver].display_name, "Ravi Kumar");
        assert!(conversation.last_message.is_none());
    }

    #[test]
    fn test_mark_read_clears_only_reader() {
        let rider = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let mut conversation = Conversation::between((rider, details("A")), (driver, details("B")));
        conversation.unread_counts.insert(rider, 2);
        conversation.unread_counts.insert(driver, 3);

        conversation.mark_read(driver);

        assert_eq!(conversation.unread_for(driver), 0);
        assert_eq!(conversation.unread_for(rider), 2);
    }

    #[test]
    fn test_last_activity_follows_last_message() {
        let rider = Uuid::new_v4();
        let mut conversation = Conversation::between((rider, details("A")), (Uuid::new_v4(), details("B")));
        assert_eq!(conversation.last_activity(), conversation.created_at);

        let message = Message::new(conversation.id, rider, "hello".to_string());
        conversation.last_message = Some(LastMessage::from(&message));
        assert_eq!(conversation.last_activity(), message.sent_at);
    }

    #[test]
    fn test_other_participant() {
        let rider = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let conversation = Conversation::between((rider, details("A")), (driver, details("B")));

        assert_eq!(conversation.other_participant(rider), Some(driver));
        assert_eq!(conversation.other_participant(driver), Some(rider));
        assert_eq!(conversation.other_participant(Uuid::new_v4()), None);
    }

    #[test]
    fn test_unread_counts_serialize_keyed_by_user() {
        let rider = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let conversation = Conversation::between((rider, details("A")), (driver, details("B")));

        let json = serde_json::to_value(&conversation.unread_counts).unwrap();
        assert_eq!(json[rider.to_string()], 0);

        let back: HashMap<Uuid, i32> = serde_json::from_value(json).unwrap();
        assert_eq!(back, conversation.unread_counts);
    }
}
