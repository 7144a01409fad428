use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::debug;

/// Topics mirror the message-bus topics the notification and reminder
/// consumers subscribe to.
pub mod topics {
    pub const BOOKED: &str = "appointment.booked";
    pub const CANCELLED: &str = "appointment.cancelled";
    pub const RESCHEDULED: &str = "appointment.rescheduled";
    pub const STATUS_UPDATED: &str = "appointment.status.updated";
    pub const AVAILABILITY_UPDATED: &str = "doctor.availability.updated";
    pub const REMINDER: &str = "appointment.reminder";
}

/// Publish-only fan-out to downstream consumers. Publishing never fails the
/// calling operation: a delivery problem is logged and swallowed, and the
/// booking transaction has already committed by the time an event goes out.
#[derive(Clone)]
pub struct EventSink {
    tx: broadcast::Sender<String>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn publish(&self, topic: &str, payload: Value) {
        let envelope = json!({ "topic": topic, "payload": payload }).to_string();
        match self.tx.send(envelope) {
            Ok(subscribers) => debug!(topic, subscribers, "event published"),
            Err(_) => debug!(topic, "event dropped, no active subscribers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_events_reach_subscribers_with_topic_envelope() {
        let sink = EventSink::new(8);
        let mut rx = sink.subscribe();

        sink.publish(topics::BOOKED, json!({ "appointment_id": "abc" }));

        let raw = rx.recv().await.expect("event should be delivered");
        let envelope: Value = serde_json::from_str(&raw).expect("envelope should be JSON");
        assert_eq!(envelope["topic"], topics::BOOKED);
        assert_eq!(envelope["payload"]["appointment_id"], "abc");
    }

    #[test]
    fn publish_without_subscribers_does_not_panic_or_error() {
        let sink = EventSink::new(8);
        sink.publish(topics::CANCELLED, json!({}));
    }
}
