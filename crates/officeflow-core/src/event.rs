use tokio::sync::broadcast;

use crate::types::AppEvent;

/// Fan-out of [`AppEvent`]s to UI subscribers.
///
/// Clones share one channel. A subscriber that falls more than `capacity`
/// events behind sees `RecvError::Lagged` and resumes from the oldest
/// retained event.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers. Without any, the event is dropped.
    pub fn publish(&self, event: AppEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionState;

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.publish(AppEvent::info("nobody listening"));
    }

    #[test]
    fn clones_share_subscribers() {
        let bus = EventBus::new(4);
        let _rx = bus.clone().subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(AppEvent::ConnectionState(ConnectionState::Open));
        match rx.recv().await.unwrap() {
            AppEvent::ConnectionState(state) => assert_eq!(state, ConnectionState::Open),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
