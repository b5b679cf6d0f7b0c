use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::message::Message;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    RoutePublished {
        route_id: Uuid,
    },
    RouteRemoved {
        route_id: Uuid,
    },
    MessagePosted {
        participant_ids: Vec<Uuid>,
        message: Message,
    },
    ConversationRead {
        conversation_id: Uuid,
        participant_ids: Vec<Uuid>,
        user_id: Uuid,
    },
    /// The subscriber fell behind and missed events; it should reload.
    Resync,
}

impl FeedEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FeedEvent::RoutePublished { .. } => "route_published",
            FeedEvent::RouteRemoved { .. } => "route_removed",
            FeedEvent::MessagePosted { .. } => "message_posted",
            FeedEvent::ConversationRead { .. } => "conversation_read",
            FeedEvent::Resync => "resync",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFilter {
    Catalog,
    Inbox(Uuid),
    Conversation(Uuid),
}

impl FeedFilter {
    pub fn matches(&self, event: &FeedEvent) -> bool {
        match (self, event) {
            (_, FeedEvent::Resync) => true,
            (FeedFilter::Catalog, FeedEvent::RoutePublished { .. } | FeedEvent::RouteRemoved { .. }) => true,
            (FeedFilter::Inbox(user_id), FeedEvent::MessagePosted { participant_ids, .. })
            | (FeedFilter::Inbox(user_id), FeedEvent::ConversationRead { participant_ids, .. }) => {
                participant_ids.contains(user_id)
            }
            (FeedFilter::Conversation(id), FeedEvent::MessagePosted { message, .. }) => {
                message.conversation_id == *id
            }
            (FeedFilter::Conversation(id), FeedEvent::ConversationRead { conversation_id, .. }) => {
                conversation_id == id
            }
            _ => false,
        }
    }
}

/// In-process fan-out of committed changes. Delivery is best effort: a slow
/// subscriber gets a `Resync` instead of the events it missed.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<FeedEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: FeedEvent) {
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(receivers, "feed event published"),
            Err(_) => tracing::trace!("feed event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self, filter: FeedFilter) -> impl Stream<Item = FeedEvent> + Send + 'static + use<> {
        let mut rx = self.sender.subscribe();

        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if filter.matches(&event) {
                            yield event;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(?filter, skipped, "feed subscriber lagged");
                        yield FeedEvent::Resync;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!(?filter, "feed closed");
                        break;
                    }
                }
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn message(conversation_id: Uuid) -> Message {
        Message::new(conversation_id, Uuid::new_v4(), "hi".to_string())
    }

    #[test]
    fn test_filters() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let conversation_id = Uuid::new_v4();
        let posted = FeedEvent::MessagePosted {
            participant_ids: vec![user, other],
            message: message(conversation_id),
        };
        let published = FeedEvent::RoutePublished { route_id: Uuid::new_v4() };

        assert!(FeedFilter::Catalog.matches(&published));
        assert!(!FeedFilter::Catalog.matches(&posted));
        assert!(FeedFilter::Inbox(user).matches(&posted));
        assert!(!FeedFilter::Inbox(Uuid::new_v4()).matches(&posted));
        assert!(FeedFilter::Conversation(conversation_id).matches(&posted));
        assert!(!FeedFilter::Conversation(Uuid::new_v4()).matches(&posted));
        assert!(FeedFilter::Inbox(user).matches(&FeedEvent::Resync));
    }

    #[tokio::test]
    async fn test_subscriber_sees_only_matching_events() {
        let feed = ChangeFeed::new(16);
        let conversation_id = Uuid::new_v4();
        let stream = feed.subscribe(FeedFilter::Conversation(conversation_id));
        tokio::pin!(stream);

        feed.publish(FeedEvent::RoutePublished { route_id: Uuid::new_v4() });
        feed.publish(FeedEvent::MessagePosted {
            participant_ids: vec![],
            message: message(Uuid::new_v4()),
        });
        let wanted = message(conversation_id);
        feed.publish(FeedEvent::MessagePosted {
            participant_ids: vec![],
            message: wanted.clone(),
        });

        match stream.next().await {
            Some(FeedEvent::MessagePosted { message, .. }) => assert_eq!(message, wanted),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lagging_subscriber_gets_resync() {
        let feed = ChangeFeed::new(2);
        let stream = feed.subscribe(FeedFilter::Catalog);
        tokio::pin!(stream);

        for _ in 0..5 {
            feed.publish(FeedEvent::RouteRemoved { route_id: Uuid::new_v4() });
        }

        assert_eq!(stream.next().await, Some(FeedEvent::Resync));
    }

    #[tokio::test]
    async fn test_stream_outlives_the_handle_it_came_from() {
        let feed = ChangeFeed::new(4);
        let stream = {
            let handle = feed.clone();
            handle.subscribe(FeedFilter::Catalog)
        };
        tokio::pin!(stream);

        let route_id = Uuid::new_v4();
        feed.publish(FeedEvent::RoutePublished { route_id });

        assert_eq!(stream.next().await, Some(FeedEvent::RoutePublished { route_id }));
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let feed = ChangeFeed::new(4);
        feed.publish(FeedEvent::Resync);
        assert_eq!(feed.subscriber_count(), 0);
    }
}
