//! Best-effort ticket printing.
//!
//! Persistence never waits on a printer: handlers enqueue a job on a bounded
//! channel after the sale is stored, and a worker task delivers it to the
//! thermal-printer bridge. Every failure on this path is logged and dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::sale;

/// One renderable ticket line.
#[derive(Debug, Clone, Serialize)]
pub struct TicketLine {
    pub quantity: i32,
    pub name: String,
    pub total_price: Decimal,
}

/// Everything the printer bridge needs to render a ticket or kitchen order.
#[derive(Debug, Clone, Serialize)]
pub struct TicketPayload {
    pub sale_id: Uuid,
    pub daily_id: i64,
    pub ruc: String,
    pub customer_name: String,
    pub mode: String,
    pub date: DateTime<Utc>,
    pub items: Vec<TicketLine>,
    pub total_amount: Decimal,
    pub iva10: Decimal,
    pub iva5: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timbrado_number: Option<String>,
}

#[derive(Debug, Clone)]
pub enum PrintJob {
    CustomerTicket(TicketPayload),
    KitchenOrder(TicketPayload),
}

#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    #[error("printer request failed: {0}")]
    Request(String),
    #[error("printer responded with status {0}")]
    Status(u16),
}

#[async_trait]
pub trait PrinterClient: Send + Sync {
    async fn print_customer_ticket(&self, ticket: &TicketPayload) -> Result<(), PrintError>;
    async fn print_kitchen_order(&self, ticket: &TicketPayload) -> Result<(), PrintError>;
}

/// HTTP client for the printer bridge sitting next to the thermal printer.
pub struct HttpPrinterClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPrinterClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn post(&self, path: &str, ticket: &TicketPayload) -> Result<(), PrintError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .post(&url)
            .json(ticket)
            .send()
            .await
            .map_err(|e| PrintError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PrintError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl PrinterClient for HttpPrinterClient {
    async fn print_customer_ticket(&self, ticket: &TicketPayload) -> Result<(), PrintError> {
        self.post("print/ticket", ticket).await
    }

    async fn print_kitchen_order(&self, ticket: &TicketPayload) -> Result<(), PrintError> {
        self.post("print/kitchen", ticket).await
    }
}

/// Used when no printer bridge is configured.
pub struct NoopPrinterClient;

#[async_trait]
impl PrinterClient for NoopPrinterClient {
    async fn print_customer_ticket(&self, ticket: &TicketPayload) -> Result<(), PrintError> {
        debug!(sale_id = %ticket.sale_id, "printing disabled; dropping customer ticket");
        Ok(())
    }

    async fn print_kitchen_order(&self, ticket: &TicketPayload) -> Result<(), PrintError> {
        debug!(sale_id = %ticket.sale_id, "printing disabled; dropping kitchen order");
        Ok(())
    }
}

/// Producer handle for print jobs. Enqueueing never blocks the request path;
/// a full queue drops the job with a warning.
#[derive(Clone)]
pub struct PrintQueue {
    tx: mpsc::Sender<PrintJob>,
}

impl PrintQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PrintJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, job: PrintJob) {
        if let Err(e) = self.tx.try_send(job) {
            warn!(error = %e, "Print queue full or closed; dropping job");
        }
    }
}

/// Consumes print jobs until the queue closes. Failures never escape.
pub fn spawn_print_worker(
    client: Arc<dyn PrinterClient>,
    mut rx: mpsc::Receiver<PrintJob>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("Print worker started");
        while let Some(job) = rx.recv().await {
            let result = match &job {
                PrintJob::CustomerTicket(ticket) => client.print_customer_ticket(ticket).await,
                PrintJob::KitchenOrder(ticket) => client.print_kitchen_order(ticket).await,
            };
            if let Err(e) = result {
                let sale_id = match &job {
                    PrintJob::CustomerTicket(t) | PrintJob::KitchenOrder(t) => t.sale_id,
                };
                warn!(error = %e, sale_id = %sale_id, "Print job failed");
            }
        }
        info!("Print worker stopped");
    })
}

/// Renders a persisted sale into the printable payload.
pub fn ticket_payload(sale: &sale::Model) -> TicketPayload {
    TicketPayload {
        sale_id: sale.id,
        daily_id: sale.daily_id,
        ruc: sale.ruc.clone(),
        customer_name: sale.customer_name.clone(),
        mode: sale.mode.clone(),
        date: sale.date,
        items: sale
            .products
            .0
            .iter()
            .map(|item| TicketLine {
                quantity: item.quantity,
                name: item.name.clone(),
                total_price: item.total_price,
            })
            .collect(),
        total_amount: sale.total_amount,
        iva10: sale.totals.iva10,
        iva5: sale.totals.iva5,
        invoice_number: sale.invoice_number.clone(),
        timbrado_number: sale.timbrado_number.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> TicketPayload {
        TicketPayload {
            sale_id: Uuid::new_v4(),
            daily_id: 7,
            ruc: "80012345-6".to_string(),
            customer_name: "Cliente Ocasional".to_string(),
            mode: "local".to_string(),
            date: Utc::now(),
            items: vec![TicketLine {
                quantity: 2,
                name: "Empanada".to_string(),
                total_price: dec!(10000),
            }],
            total_amount: dec!(10000),
            iva10: dec!(909),
            iva5: dec!(0),
            invoice_number: None,
            timbrado_number: None,
        }
    }

    struct RecordingPrinter {
        tickets: Mutex<Vec<Uuid>>,
        kitchen: Mutex<Vec<Uuid>>,
        fail_first_kitchen: bool,
    }

    #[async_trait]
    impl PrinterClient for RecordingPrinter {
        async fn print_customer_ticket(&self, ticket: &TicketPayload) -> Result<(), PrintError> {
            self.tickets.lock().unwrap().push(ticket.sale_id);
            Ok(())
        }

        async fn print_kitchen_order(&self, ticket: &TicketPayload) -> Result<(), PrintError> {
            let mut kitchen = self.kitchen.lock().unwrap();
            if self.fail_first_kitchen && kitchen.is_empty() {
                kitchen.push(ticket.sale_id);
                return Err(PrintError::Status(503));
            }
            kitchen.push(ticket.sale_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn worker_drains_queue_and_survives_failures() {
        let printer = Arc::new(RecordingPrinter {
            tickets: Mutex::new(Vec::new()),
            kitchen: Mutex::new(Vec::new()),
            fail_first_kitchen: true,
        });
        let (queue, rx) = PrintQueue::new(8);
        let handle = spawn_print_worker(printer.clone(), rx);

        queue.enqueue(PrintJob::KitchenOrder(payload()));
        queue.enqueue(PrintJob::KitchenOrder(payload()));
        queue.enqueue(PrintJob::CustomerTicket(payload()));
        drop(queue);

        handle.await.unwrap();

        // The failing first job did not stop the worker
        assert_eq!(printer.kitchen.lock().unwrap().len(), 2);
        assert_eq!(printer.tickets.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn enqueue_on_full_queue_drops_without_panicking() {
        let (queue, _rx) = PrintQueue::new(1);
        queue.enqueue(PrintJob::CustomerTicket(payload()));
        // Queue is full now; this is dropped silently
        queue.enqueue(PrintJob::CustomerTicket(payload()));
    }

    #[tokio::test]
    async fn http_client_posts_to_bridge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/print/kitchen"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpPrinterClient::new(server.uri());
        client.print_kitchen_order(&payload()).await.unwrap();
    }

    #[tokio::test]
    async fn http_client_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/print/ticket"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpPrinterClient::new(server.uri());
        let err = client.print_customer_ticket(&payload()).await.unwrap_err();
        assert!(matches!(err, PrintError::Status(500)));
    }
}
