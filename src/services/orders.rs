use crate::{
    db::DbPool,
    entities::order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::payment::{self, Entity as PaymentEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog::CatalogService,
    services::{round2, stock},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Order lifecycle: `DRAFT --[fully paid]--> PAID --[cancel]--> CANCELLED`,
/// `DRAFT --[cancel]--> CANCELLED`. PAID and CANCELLED are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Draft,
    Paid,
    Cancelled,
}

/// Request/Response types for the order service
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Option<i64>,
    #[validate]
    pub items: Vec<OrderLineRequest>,
    pub discount_amount: Option<Decimal>,
    pub tax_percent: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLineRequest {
    pub item_id: i64,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub qty: i32,
    /// Explicit unit price override; catalog cost applies when omitted.
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_id: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub cashier_user_id: i64,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Full order view: header, immutable lines, payment history, running
/// paid/due totals.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDetailResponse {
    pub order: OrderResponse,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<order_item::Model>,
    #[schema(value_type = Vec<Object>)]
    pub payments: Vec<payment::Model>,
    pub paid: Decimal,
    pub due: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelOrderResponse {
    pub order_id: i64,
    pub status: OrderStatus,
    /// Whether this call restored stock (only when a PAID order was
    /// cancelled by this call).
    pub stock_restored: bool,
}

/// Monetary breakdown of an order computed from its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// Compute subtotal/discount/tax/total from line totals. The discount is
/// clamped at zero and cannot push the taxable amount negative.
pub fn compute_totals(
    line_totals: &[Decimal],
    discount_amount: Decimal,
    tax_percent: Decimal,
) -> OrderTotals {
    let subtotal: Decimal = line_totals.iter().copied().sum();
    let discount = round2(discount_amount.max(Decimal::ZERO));
    let taxable = (subtotal - discount).max(Decimal::ZERO);
    let tax_amount = round2(taxable * tax_percent / Decimal::from(100));
    let total_amount = round2(taxable + tax_amount);

    OrderTotals {
        subtotal: round2(subtotal),
        discount_amount: discount,
        tax_amount,
        total_amount,
    }
}

/// Builds draft orders from the catalog and handles cancellation, including
/// stock reversal for orders that had already settled.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    catalog: Arc<CatalogService>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(
        db: Arc<DbPool>,
        catalog: Arc<CatalogService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            catalog,
            event_sender,
        }
    }

    /// Create a draft order from the requested lines, snapshotting item
    /// names and prices from the catalog. The order header and all lines
    /// are persisted in one transaction.
    #[instrument(skip(self, request), fields(cashier_user_id = cashier_user_id))]
    pub async fn create_order(
        &self,
        cashier_user_id: i64,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ServiceError> {
        request.validate()?;

        if request.items.is_empty() {
            return Err(ServiceError::EmptyOrder);
        }

        let item_ids: Vec<i64> = request.items.iter().map(|line| line.item_id).collect();
        let catalog = self.catalog.resolve(&item_ids).await?;

        struct PreparedLine {
            item_id: i64,
            item_name: String,
            qty: i32,
            unit_price: Decimal,
            line_total: Decimal,
        }

        let mut lines = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let entry = catalog.get(&line.item_id).ok_or_else(|| {
                ServiceError::InvalidReference(format!("Unknown item id(s): {}", line.item_id))
            })?;
            let unit_price = line.unit_price.unwrap_or(entry.cost);
            let line_total = unit_price * Decimal::from(line.qty);
            lines.push(PreparedLine {
                item_id: line.item_id,
                item_name: entry.name.clone(),
                qty: line.qty,
                unit_price,
                line_total,
            });
        }

        let line_totals: Vec<Decimal> = lines.iter().map(|l| l.line_total).collect();
        let totals = compute_totals(
            &line_totals,
            request.discount_amount.unwrap_or(Decimal::ZERO),
            request.tax_percent.unwrap_or(Decimal::ZERO),
        );

        let now = Utc::now();
        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_model = OrderActiveModel {
            customer_id: Set(request.customer_id),
            cashier_user_id: Set(cashier_user_id),
            status: Set(OrderStatus::Draft.to_string()),
            subtotal: Set(totals.subtotal),
            discount_amount: Set(totals.discount_amount),
            tax_amount: Set(totals.tax_amount),
            total_amount: Set(totals.total_amount),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for line in lines {
            order_item::ActiveModel {
                order_id: Set(order_model.id),
                item_id: Set(line.item_id),
                item_name: Set(line.item_name),
                qty: Set(line.qty),
                unit_price: Set(line.unit_price),
                line_total: Set(line.line_total),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        info!(order_id = order_model.id, total_amount = %totals.total_amount, "Order created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderCreated {
                    order_id: order_model.id,
                    total_amount: totals.total_amount,
                })
                .await
            {
                warn!(order_id = order_model.id, error = %e, "Failed to send order created event");
            }
        }

        Ok(CreateOrderResponse {
            order_id: order_model.id,
            total_amount: totals.total_amount,
        })
    }

    /// Fetch the full order view: header, lines, payments, paid/due.
    #[instrument(skip(self), fields(order_id = order_id))]
    pub async fn get_order(&self, order_id: i64) -> Result<OrderDetailResponse, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?;

        let payments = PaymentEntity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .order_by_asc(payment::Column::Id)
            .all(&*self.db)
            .await?;

        let paid = round2(payments.iter().map(|p| p.amount).sum());
        let due = round2(order.total_amount - paid);

        Ok(OrderDetailResponse {
            order: model_to_response(order)?,
            items,
            payments,
            paid,
            due,
        })
    }

    /// Cancel an order. Cancelling an already-cancelled order is a no-op
    /// success. Cancelling a PAID order restores every line's stock in the
    /// same transaction as the status change; a DRAFT order never touched
    /// stock, so none is restored.
    #[instrument(skip(self), fields(order_id = order_id))]
    pub async fn cancel_order(&self, order_id: i64) -> Result<CancelOrderResponse, ServiceError> {
        let txn = self.db.begin().await?;

        // Same exclusive lock as add_payment so cancellation cannot race a
        // concurrent settlement of this order.
        let order = OrderEntity::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let status = OrderStatus::from_str(&order.status).map_err(|_| {
            ServiceError::InternalError(format!("unknown order status {}", order.status))
        })?;

        if status == OrderStatus::Cancelled {
            txn.commit().await?;
            return Ok(CancelOrderResponse {
                order_id,
                status: OrderStatus::Cancelled,
                stock_restored: false,
            });
        }

        let restore_stock = status == OrderStatus::Paid;
        if restore_stock {
            let items = OrderItemEntity::find()
                .filter(order_item::Column::OrderId.eq(order_id))
                .all(&txn)
                .await?;

            let deltas: Vec<(i64, i32)> =
                items.iter().map(|line| (line.item_id, line.qty)).collect();
            stock::apply_deltas(&txn, &deltas).await?;
        }

        let mut active: OrderActiveModel = order.into();
        active.status = Set(OrderStatus::Cancelled.to_string());
        active.updated_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        txn.commit().await?;

        info!(order_id, stock_restored = restore_stock, "Order cancelled");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderCancelled {
                    order_id,
                    stock_restored: restore_stock,
                })
                .await
            {
                warn!(order_id, error = %e, "Failed to send order cancelled event");
            }
        }

        Ok(CancelOrderResponse {
            order_id,
            status: OrderStatus::Cancelled,
            stock_restored: restore_stock,
        })
    }
}

/// Converts an order model to response format
pub(crate) fn model_to_response(model: order::Model) -> Result<OrderResponse, ServiceError> {
    let status = OrderStatus::from_str(&model.status).map_err(|_| {
        ServiceError::InternalError(format!("unknown order status {}", model.status))
    })?;

    Ok(OrderResponse {
        id: model.id,
        customer_id: model.customer_id,
        cashier_user_id: model.cashier_user_id,
        status,
        subtotal: model.subtotal,
        discount_amount: model.discount_amount,
        tax_amount: model.tax_amount,
        total_amount: model.total_amount,
        notes: model.notes,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}
