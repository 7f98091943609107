use crate::{
    db::DbPool,
    entities::invoice::{self, Entity as InvoiceEntity},
    entities::order::Entity as OrderEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    services::orders::OrderStatus,
};
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Derive the invoice number for an order issued on the given date.
pub fn invoice_number_for(order_id: i64, issue_date: NaiveDate) -> String {
    format!("INV-{}-{}", issue_date.format("%Y%m%d"), order_id)
}

/// Issues at most one invoice per settled order. Issuance is idempotent:
/// re-requesting returns the stored number unchanged, and a concurrent
/// duplicate insert is treated as success.
#[derive(Clone)]
pub struct InvoicingService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

/// Issue an invoice inside the caller's transaction. Used by the payment
/// processor so the invoice commits or rolls back with the settlement.
pub async fn issue_in_txn<C: ConnectionTrait>(
    conn: &C,
    order_id: i64,
) -> Result<String, ServiceError> {
    if let Some(existing) = InvoiceEntity::find()
        .filter(invoice::Column::OrderId.eq(order_id))
        .one(conn)
        .await?
    {
        return Ok(existing.invoice_number);
    }

    let number = invoice_number_for(order_id, Utc::now().date_naive());

    let model = invoice::ActiveModel {
        order_id: Set(order_id),
        invoice_number: Set(number.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let insert = InvoiceEntity::insert(model)
        .on_conflict(
            OnConflict::column(invoice::Column::OrderId)
                .do_nothing()
                .to_owned(),
        )
        .exec(conn)
        .await;

    match insert {
        Ok(_) => Ok(number),
        // Lost the race: another issuer inserted first, their number wins.
        Err(DbErr::RecordNotInserted) => {
            let existing = InvoiceEntity::find()
                .filter(invoice::Column::OrderId.eq(order_id))
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "invoice for order {} vanished after conflicting insert",
                        order_id
                    ))
                })?;
            Ok(existing.invoice_number)
        }
        Err(e) => Err(e.into()),
    }
}

impl InvoicingService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Issue (or re-fetch) the invoice for a settled order.
    #[instrument(skip(self), fields(order_id = order_id))]
    pub async fn issue_invoice(&self, order_id: i64) -> Result<String, ServiceError> {
        let txn = self.db.begin().await?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let status = OrderStatus::from_str(&order.status).map_err(|_| {
            ServiceError::InternalError(format!("unknown order status {}", order.status))
        })?;
        if status != OrderStatus::Paid {
            return Err(ServiceError::OrderNotSettled(order_id));
        }

        let number = issue_in_txn(&txn, order_id).await?;

        txn.commit().await?;

        if let Some(event_sender) = &self.event_sender {
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

        Ok(number)
    }
}
