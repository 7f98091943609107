use crate::{
    db::DbPool,
    entities::item::{self, Entity as ItemEntity},
    errors::ServiceError,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::instrument;

/// The stock ledger: one on-hand quantity per item, mutated only by order
/// settlement (decrement) and cancellation of a paid order (increment).
#[derive(Clone)]
pub struct StockService {
    db: Arc<DbPool>,
}

/// Apply a batch of quantity deltas within the caller's transaction.
///
/// Each delta executes as `quantity = quantity + delta`, so the ledger never
/// round-trips through a read. Quantities are allowed to go negative: an
/// oversold item is a signal for the shopkeeper, not a reason to reject a
/// sale that already happened at the till.
pub async fn apply_deltas<C: ConnectionTrait>(
    conn: &C,
    deltas: &[(i64, i32)],
) -> Result<(), ServiceError> {
    for (item_id, delta) in deltas {
        let result = ItemEntity::update_many()
            .col_expr(
                item::Column::Quantity,
                Expr::col(item::Column::Quantity).add(*delta),
            )
            .filter(item::Column::Id.eq(*item_id))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::InvalidReference(format!(
                "Unknown item id(s): {}",
                item_id
            )));
        }
    }

    Ok(())
}

impl StockService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Paginated catalog/stock listing with optional name search and a
    /// low-stock filter (`quantity <= min_threshold`).
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: u64,
        limit: u64,
        search: Option<&str>,
        low_stock_only: bool,
    ) -> Result<(Vec<item::Model>, u64), ServiceError> {
        let mut query = ItemEntity::find().order_by_asc(item::Column::Name);

        if let Some(term) = search {
            let pattern = format!("%{}%", term);
            query = query.filter(item::Column::Name.like(pattern));
        }

        if low_stock_only {
            query = query.filter(
                Expr::col(item::Column::Quantity).lte(Expr::col(item::Column::MinThreshold)),
            );
        }

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total))
    }

    /// Current on-hand quantity for one item.
    pub async fn on_hand(&self, item_id: i64) -> Result<i32, ServiceError> {
        let row = ItemEntity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;
        Ok(row.quantity)
    }
}
