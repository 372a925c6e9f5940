use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted as orders move through their lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PaymentSucceeded(Uuid),
    PaymentFailed(Uuid),
    GatewayInitiateFailed(Uuid),
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

/// Drains the event channel, logging each event. Runs for the lifetime of the
/// process; exits when every sender has been dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(order_id = %order_id, "Order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id = %order_id, old_status = %old_status, new_status = %new_status, "Order status changed");
            }
            Event::PaymentSucceeded(order_id) => {
                info!(order_id = %order_id, "Payment succeeded");
            }
            Event::PaymentFailed(order_id) => {
                info!(order_id = %order_id, "Payment failed");
            }
            Event::GatewayInitiateFailed(order_id) => {
                warn!(order_id = %order_id, "Gateway initiate failed");
            }
        }
    }
    info!("Event channel closed; event processor exiting");
}
