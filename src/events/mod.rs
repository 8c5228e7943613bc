use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Events emitted by the dispatch core after a transaction commits.
///
/// Delivery is best-effort: a send failure is logged by the caller as a
/// warning and never fails the originating operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Requisition lifecycle
    RequisitionSubmitted(Uuid),
    RequisitionApproved(Uuid),
    RequisitionPackaged {
        requisition_id: Uuid,
        rounded_slot_demand: String,
    },
    RequisitionRejected(Uuid),
    RequisitionCancelled(Uuid),
    RequisitionReadyForDispatch(Uuid),
    RequisitionsAssignedToBatch {
        batch_id: Uuid,
        count: u64,
    },

    // Batch lifecycle
    BatchCreated(Uuid),
    BatchDriverAssigned {
        batch_id: Uuid,
        driver_id: Uuid,
    },
    BatchVehicleAssigned {
        batch_id: Uuid,
        vehicle_id: Uuid,
    },
    BatchDispatched {
        batch_id: Uuid,
        requisitions_in_transit: u64,
    },
    BatchCompleted {
        batch_id: Uuid,
        requisitions_fulfilled: u64,
    },
    BatchCancelled {
        batch_id: Uuid,
        requisitions_released: u64,
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
}

/// Consumes events from the channel until it closes. Spawned once at startup.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        debug!(?event, "Processing event");
    }
    info!("Event processor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_flow_through_the_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        let id = Uuid::new_v4();
        sender
            .send(Event::RequisitionSubmitted(id))
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::RequisitionSubmitted(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::BatchCreated(Uuid::new_v4())).await.is_err());
    }
}
