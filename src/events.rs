//! Domain events emitted by the services after a unit of work commits.
//!
//! Consumers (projections, notifications, outbox writers) live outside this
//! crate; the core only publishes onto a bounded channel.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Events that can occur in the inventory core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    InventoryAccountCreated {
        account_id: Uuid,
        product_id: Uuid,
        location_id: Uuid,
        quantity_on_hand: i32,
    },
    InventoryAdjusted {
        account_id: Uuid,
        product_id: Uuid,
        location_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
    },
    InventoryLevelsUpdated {
        account_id: Uuid,
        reorder_level: i32,
        max_level: i32,
    },
    InventoryAccountDeleted {
        account_id: Uuid,
        actor_id: Uuid,
    },
    TransferExecuted {
        transfer_id: Uuid,
        product_id: Uuid,
        from_location_id: Uuid,
        to_location_id: Uuid,
        quantity: i32,
    },
    TransferStatusChanged {
        transfer_id: Uuid,
        old_status: String,
        new_status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously. Failure here never rolls back the
    /// already-committed unit of work; it surfaces as an event error.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a bounded event channel and the sender handle services use.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}
