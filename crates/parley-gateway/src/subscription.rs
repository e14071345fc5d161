use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use parley_types::events::ChatEvent;

/// Lifecycle of a per-channel subscription. `Closed` is terminal; observing
/// events again requires a fresh `ChannelFeed::subscribe` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubscriptionState {
    Idle = 0,
    Subscribing = 1,
    Active = 2,
    Closed = 3,
}

impl SubscriptionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Subscribing,
            2 => Self::Active,
            _ => Self::Closed,
        }
    }
}

/// A live, single-channel view of the feed. Events scoped to the channel
/// are forwarded onto an internal queue the owner drains with [`recv`];
/// everything else is skipped. Dropping the subscription releases it on
/// every exit path, so a torn-down view can never keep receiving events.
///
/// [`recv`]: Subscription::recv
pub struct Subscription {
    channel_id: Uuid,
    state: Arc<AtomicU8>,
    rx: mpsc::UnboundedReceiver<ChatEvent>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn spawn(channel_id: Uuid, mut broadcast_rx: broadcast::Receiver<ChatEvent>) -> Self {
        let state = Arc::new(AtomicU8::new(SubscriptionState::Idle as u8));
        let (tx, rx) = mpsc::unbounded_channel();

        state.store(SubscriptionState::Subscribing as u8, Ordering::Release);

        let task_state = state.clone();
        let task = tokio::spawn(async move {
            task_state.store(SubscriptionState::Active as u8, Ordering::Release);

            loop {
                match broadcast_rx.recv().await {
                    Ok(event) => {
                        if event.channel_id() != Some(channel_id) {
                            continue;
                        }
                        // Receiver gone: the owner closed or dropped us.
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Accepted failure mode: skipped events are not
                        // replayed, the view catches up on recreation.
                        warn!(
                            "Subscription for channel {} lagged, missed {} events",
                            channel_id, missed
                        );
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            task_state.store(SubscriptionState::Closed as u8, Ordering::Release);
        });

        Self {
            channel_id,
            state,
            rx,
            task,
        }
    }

    pub fn channel_id(&self) -> Uuid {
        self.channel_id
    }

    pub fn state(&self) -> SubscriptionState {
        SubscriptionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Next event scoped to this channel, in delivery order. Returns `None`
    /// once the subscription is closed and the queue is drained.
    pub async fn recv(&mut self) -> Option<ChatEvent> {
        self.rx.recv().await
    }

    /// Release the subscription. Idempotent: safe to call repeatedly, safe
    /// during teardown, safe when no event ever arrived. Events published
    /// after this point are never delivered.
    pub fn close(&mut self) {
        let prev = self.state.swap(SubscriptionState::Closed as u8, Ordering::AcqRel);
        if SubscriptionState::from_u8(prev) != SubscriptionState::Closed {
            self.task.abort();
            self.rx.close();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ChannelFeed;
    use chrono::Utc;

    fn message_event(channel_id: Uuid) -> ChatEvent {
        ChatEvent::MessageCreate {
            id: Uuid::new_v4(),
            channel_id,
            sender_id: "bob".into(),
            content: "yo".into(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_state_reaches_active_then_closed() {
        let feed = ChannelFeed::new();
        let channel_id = Uuid::new_v4();
        let mut sub = feed.subscribe(channel_id);

        assert!(matches!(
            sub.state(),
            SubscriptionState::Subscribing | SubscriptionState::Active
        ));

        // Round-trip one event so the forward task is definitely running.
        feed.publish(message_event(channel_id));
        sub.recv().await.unwrap();
        assert_eq!(sub.state(), SubscriptionState::Active);

        sub.close();
        assert_eq!(sub.state(), SubscriptionState::Closed);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let feed = ChannelFeed::new();
        let mut sub = feed.subscribe(Uuid::new_v4());

        // Never received anything; closing twice must still be fine.
        sub.close();
        sub.close();
        assert_eq!(sub.state(), SubscriptionState::Closed);
    }

    #[tokio::test]
    async fn test_no_delivery_after_close() {
        let feed = ChannelFeed::new();
        let channel_id = Uuid::new_v4();
        let mut sub = feed.subscribe(channel_id);

        sub.close();
        feed.publish(message_event(channel_id));

        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_releases_the_broadcast_slot() {
        let feed = ChannelFeed::new();
        let channel_id = Uuid::new_v4();

        {
            let _sub = feed.subscribe(channel_id);
        }

        // The forward task exits once its owner is gone; publishing must
        // not panic or accumulate anywhere.
        tokio::task::yield_now().await;
        feed.publish(message_event(channel_id));
    }
}
