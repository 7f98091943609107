use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

/// Domain events emitted after a billing unit of work commits. Consumers are
/// notified post-commit only; an event is never a substitute for the
/// transactional state itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: i64,
        total_amount: Decimal,
    },
    PaymentRecorded {
        order_id: i64,
        method: String,
        amount: Decimal,
    },
    OrderSettled {
        order_id: i64,
    },
    OrderCancelled {
        order_id: i64,
        stock_restored: bool,
    },
    InvoiceIssued {
        order_id: i64,
        invoice_number: String,
    },
    StockAdjusted {
        item_id: i64,
        delta: i32,
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

/// Consume and log domain events until every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                total_amount,
            } => {
                info!(order_id, %total_amount, "order created");
            }
            Event::PaymentRecorded {
                order_id,
                method,
                amount,
            } => {
                info!(order_id, %method, %amount, "payment recorded");
            }
            Event::OrderSettled { order_id } => {
                info!(order_id, "order settled");
            }
            Event::OrderCancelled {
                order_id,
                stock_restored,
            } => {
                info!(order_id, stock_restored, "order cancelled");
            }
            Event::InvoiceIssued {
                order_id,
                invoice_number,
            } => {
                info!(order_id, %invoice_number, "invoice issued");
            }
            Event::StockAdjusted { item_id, delta } => {
                info!(item_id, delta, "stock adjusted");
            }
        }
    }
}
