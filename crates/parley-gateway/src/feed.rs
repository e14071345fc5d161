use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use parley_types::events::ChatEvent;

use crate::subscription::Subscription;

/// Fan-out hub for chat events. The store-side of every append publishes
/// here; connected clients observe inserts without polling. Cloning is
/// cheap and all clones share one stream.
#[derive(Clone)]
pub struct ChannelFeed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    broadcast_tx: broadcast::Sender<ChatEvent>,
}

impl ChannelFeed {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(FeedInner { broadcast_tx }),
        }
    }

    /// Publish an event to every live subscriber. Dropped silently when
    /// nobody is listening.
    pub fn publish(&self, event: ChatEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Raw firehose of every event; connection loops filter per client.
    pub fn subscribe_raw(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Filtered subscription scoped to one channel: only events whose
    /// `channel_id` matches are delivered, each at most once, in the order
    /// the feed emits them.
    pub fn subscribe(&self, channel_id: Uuid) -> Subscription {
        Subscription::spawn(channel_id, self.subscribe_raw())
    }
}

impl Default for ChannelFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message_event(channel_id: Uuid, content: &str) -> ChatEvent {
        ChatEvent::MessageCreate {
            id: Uuid::new_v4(),
            channel_id,
            sender_id: "alice".into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_delivers_exactly_once() {
        let feed = ChannelFeed::new();
        let channel_id = Uuid::new_v4();
        let mut sub = feed.subscribe(channel_id);

        feed.publish(message_event(channel_id, "hi"));

        let event = sub.recv().await.unwrap();
        match event {
            ChatEvent::MessageCreate { content, .. } => assert_eq!(content, "hi"),
            other => panic!("unexpected event: {:?}", other),
        }

        // Nothing further was published; the queue must be empty.
        feed.publish(ChatEvent::Ready {
            user_id: "alice".into(),
        });
        tokio::task::yield_now().await;
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_other_channels_are_filtered_out() {
        let feed = ChannelFeed::new();
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let mut sub = feed.subscribe(mine);

        feed.publish(message_event(theirs, "not for you"));
        feed.publish(message_event(mine, "for you"));

        match sub.recv().await.unwrap() {
            ChatEvent::MessageCreate { content, channel_id, .. } => {
                assert_eq!(content, "for you");
                assert_eq!(channel_id, mine);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_events_arrive_in_publish_order() {
        let feed = ChannelFeed::new();
        let channel_id = Uuid::new_v4();
        let mut sub = feed.subscribe(channel_id);

        for i in 0..10 {
            feed.publish(message_event(channel_id, &i.to_string()));
        }

        for i in 0..10 {
            match sub.recv().await.unwrap() {
                ChatEvent::MessageCreate { content, .. } => {
                    assert_eq!(content, i.to_string());
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }
}
