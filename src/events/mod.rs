use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Events emitted by the engine after a unit of work commits. Consumers
/// are in-process; delivery failure is logged and never affects stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Transfer workflow events
    TransferCreated(Uuid),
    TransferApproved(Uuid),
    TransferDispatched(Uuid),
    TransferReceived { transfer_id: Uuid, complete: bool },
    TransferCancelled(Uuid),

    // Batch tracker events
    BatchCreated(Uuid),
    BatchStatusChanged {
        batch_id: Uuid,
        old_status: String,
        new_status: String,
    },
    BatchesExpired {
        tenant_id: Uuid,
        count: u64,
    },

    // Generic event data
    Generic {
        message: String,
        metadata: serde_json::Value,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Non-blocking send used on paths that must not wait on a full
    /// channel; the caller logs and moves on if the event is dropped.
    pub fn try_send(&self, event: Event) -> Result<(), String> {
        self.sender
            .try_send(event)
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Builds a sender/receiver pair with a bounded buffer.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event. Spawn this next to the
/// engine; richer consumers (webhooks, projections) live with the caller.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        info!(?event, "Processing event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_receive_roundtrip() {
        let (sender, mut rx) = channel(8);
        let id = Uuid::new_v4();
        sender.send(Event::TransferDispatched(id)).await.unwrap();
        match rx.recv().await {
            Some(Event::TransferDispatched(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn try_send_fails_when_channel_full() {
        let (sender, _rx) = channel(1);
        sender.try_send(Event::TransferCreated(Uuid::new_v4())).unwrap();
        assert!(sender
            .try_send(Event::TransferCreated(Uuid::new_v4()))
            .is_err());
    }
}
