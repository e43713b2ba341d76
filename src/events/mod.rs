use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

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

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Sale events
    SaleCreated(Uuid),
    SaleUpdated(Uuid),
    SaleStatusChanged {
        sale_id: Uuid,
        old_status: String,
        new_status: String,
    },
    SaleReady(Uuid),
    SaleInvoiced {
        sale_id: Uuid,
        timbrado_code: String,
        invoice_number: String,
    },

    // Timbrado events
    TimbradoRegistered {
        timbrado_id: Uuid,
        code: String,
    },
}

/// Consumes domain events from the channel and logs them. Downstream
/// integrations (sync, analytics) subscribe here.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::SaleCreated(sale_id) => {
                info!(sale_id = %sale_id, "sale created");
            }
            Event::SaleUpdated(sale_id) => {
                info!(sale_id = %sale_id, "sale updated");
            }
            Event::SaleStatusChanged {
                sale_id,
                old_status,
                new_status,
            } => {
                info!(
                    sale_id = %sale_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    "sale status changed"
                );
            }
            Event::SaleReady(sale_id) => {
                info!(sale_id = %sale_id, "sale marked ready");
            }
            Event::SaleInvoiced {
                sale_id,
                timbrado_code,
                invoice_number,
            } => {
                info!(
                    sale_id = %sale_id,
                    timbrado_code = %timbrado_code,
                    invoice_number = %invoice_number,
                    "sale invoiced"
                );
            }
            Event::TimbradoRegistered { timbrado_id, code } => {
                info!(timbrado_id = %timbrado_id, code = %code, "timbrado registered");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        let sale_id = Uuid::new_v4();
        sender.send(Event::SaleCreated(sale_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::SaleCreated(id)) => assert_eq!(id, sale_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::SaleReady(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
