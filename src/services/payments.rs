use crate::{
    db::DbPool,
    entities::order::{ActiveModel as OrderActiveModel, Entity as OrderEntity},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::payment::{self, Entity as PaymentEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::invoicing,
    services::orders::OrderStatus,
    services::{round2, stock},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

/// Accepted settlement channels at the till.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Wallet,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddPaymentRequest {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub txn_ref: Option<String>,
    /// Issue the invoice in the same unit of work if this payment settles
    /// the order.
    #[serde(default)]
    pub generate_invoice: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentOutcome {
    pub order_id: i64,
    pub status: OrderStatus,
    /// Cumulative amount paid including this payment.
    pub paid: Decimal,
    /// Remaining balance; negative when overpaid.
    pub due: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
}

/// Records payments against draft orders and settles them exactly once.
///
/// The status read, payment insert, cumulative-paid computation, settlement
/// and stock decrement all run under one exclusive lock on the order row, so
/// two concurrent partial payments cannot both conclude they completed the
/// order.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Record a payment against a draft order. Settles the order (PAID +
    /// stock decrement, optionally invoice) when cumulative payments reach
    /// the total. Overpayment is accepted and surfaces as negative due.
    #[instrument(skip(self, request), fields(order_id = order_id, method = %request.method))]
    pub async fn add_payment(
        &self,
        order_id: i64,
        request: AddPaymentRequest,
    ) -> Result<PaymentOutcome, ServiceError> {
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::InvalidAmount(format!(
                "Payment amount must be positive, got {}",
                request.amount
            )));
        }

        let txn = self.db.begin().await?;

        let order = OrderEntity::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let status = OrderStatus::from_str(&order.status).map_err(|_| {
            ServiceError::InternalError(format!("unknown order status {}", order.status))
        })?;
        match status {
            OrderStatus::Paid => return Err(ServiceError::OrderAlreadySettled(order_id)),
            OrderStatus::Cancelled => return Err(ServiceError::OrderCancelled(order_id)),
            OrderStatus::Draft => {}
        }

        payment::ActiveModel {
            order_id: Set(order_id),
            method: Set(request.method.to_string()),
            amount: Set(request.amount),
            txn_ref: Set(request.txn_ref.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let payments = PaymentEntity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;
        let paid = round2(payments.iter().map(|p| p.amount).sum());
        let due = round2(order.total_amount - paid);

        let settled = due <= Decimal::ZERO;
        let mut invoice_number = None;

        if settled {
            let items = OrderItemEntity::find()
                .filter(order_item::Column::OrderId.eq(order_id))
                .all(&txn)
                .await?;
            let deltas: Vec<(i64, i32)> =
                items.iter().map(|line| (line.item_id, -line.qty)).collect();
            stock::apply_deltas(&txn, &deltas).await?;

            let mut active: OrderActiveModel = order.into();
            active.status = Set(OrderStatus::Paid.to_string());
            active.updated_at = Set(Some(Utc::now()));
            active.update(&txn).await?;

            if request.generate_invoice {
                invoice_number = Some(invoicing::issue_in_txn(&txn, order_id).await?);
            }
        }

        txn.commit().await?;

        info!(order_id, paid = %paid, due = %due, settled, "Payment recorded");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::PaymentRecorded {
                    order_id,
                    method: request.method.to_string(),
                    amount: request.amount,
                })
                .await
            {
                warn!(order_id, error = %e, "Failed to send payment recorded event");
            }
            if settled {
                if let Err(e) = event_sender.send(Event::OrderSettled { order_id }).await {
                    warn!(order_id, error = %e, "Failed to send order settled event");
                }
            }
            if let Some(number) = &invoice_number {
                if let Err(e) = event_sender
                    .send(Event::InvoiceIssued {
                        order_id,
                        invoice_number: number.clone(),
                    })
                    .await
                {
                    warn!(order_id, error = %e, "Failed to send invoice issued event");
                }
            }
        }

        Ok(PaymentOutcome {
            order_id,
            status: if settled {
                OrderStatus::Paid
            } else {
                OrderStatus::Draft
            },
            paid,
            due,
            invoice_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_methods_render_uppercase() {
        assert_eq!(PaymentMethod::Cash.to_string(), "CASH");
        assert_eq!(PaymentMethod::Card.to_string(), "CARD");
        assert_eq!(PaymentMethod::Upi.to_string(), "UPI");
        assert_eq!(PaymentMethod::Wallet.to_string(), "WALLET");
    }

    #[test]
    fn payment_method_parses_from_wire_form() {
        assert_eq!(
            PaymentMethod::from_str("WALLET").unwrap(),
            PaymentMethod::Wallet
        );
        assert!(PaymentMethod::from_str("CHEQUE").is_err());
    }
}
