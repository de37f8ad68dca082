// ABOUTME: Lifecycle event fan-out: port state, wire traffic, notifications, complete messages
// ABOUTME: Broadcast-channel based; sends never block the transport and lagging receivers lose events

use crate::session::types::SmsMessage;
use bytes::Bytes;
use tokio::sync::broadcast;

/// Events published by the transport and session.
///
/// Delivery is best-effort and synchronous with respect to the triggering
/// ingestion: a send that finds no receiver, or a receiver that has lagged
/// past the channel capacity, drops events rather than applying backpressure
/// to the serial read path.
#[derive(Debug, Clone)]
pub enum ModemEvent {
    /// The serial port was opened (emitted once per open)
    PortOpen,
    /// The serial port was closed (emitted at most once per close)
    PortClose,
    /// A raw chunk as read from the port, before normalization
    RawBytes(Bytes),
    /// A command was written to the modem
    Command(String),
    /// A classified response resolved a command
    Response(String),
    /// An unsolicited result code arrived while no command was in flight
    Notification(String),
    /// A complete logical message was received (post-reassembly)
    Message(SmsMessage),
}

/// Cloneable handle publishing [`ModemEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ModemEvent>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to the event stream from this point onward.
    pub fn subscribe(&self) -> broadcast::Receiver<ModemEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, event: ModemEvent) {
        // A send with no live receivers is not an error here.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fan_out_reaches_every_subscriber() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(ModemEvent::PortOpen);

        assert!(matches!(a.recv().await, Ok(ModemEvent::PortOpen)));
        assert!(matches!(b.recv().await, Ok(ModemEvent::PortOpen)));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(8);
        bus.publish(ModemEvent::Command("AT".into()));
    }
}
