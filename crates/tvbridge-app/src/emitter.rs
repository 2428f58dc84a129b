//! Session event fan-out
//!
//! A thin wrapper around a broadcast channel. Any number of subscribers may
//! listen; publishing with none attached is not an error.

use tokio::sync::broadcast;

use tvbridge_core::SessionEvent;

/// Buffered events per subscriber before the oldest are dropped
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to session events.
    ///
    /// A receiver that falls behind loses the oldest events and sees
    /// `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish to every current subscriber
    pub fn emit(&self, event: SessionEvent) {
        tracing::debug!("event: {} ({})", event.event_type(), event.message());
        // send() only fails when nobody is listening
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new();
        bus.emit(SessionEvent::Connected);

        // A late subscriber does not see earlier events
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(SessionEvent::Awake);

        assert_eq!(a.recv().await.unwrap(), SessionEvent::Awake);
        assert_eq!(b.recv().await.unwrap(), SessionEvent::Awake);
    }
}
