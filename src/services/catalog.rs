use crate::{
    db::DbPool,
    entities::item::{self, Entity as ItemEntity},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::instrument;

/// Name and unit cost snapshot for one catalog item.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub name: String,
    pub cost: Decimal,
}

/// Read-only catalog lookup used by the order engine. Lines snapshot
/// name/price at order creation, so no locking is involved here.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Resolve a set of item ids to their current name and unit cost.
    /// Fails with `InvalidReference` naming every id that did not resolve.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        item_ids: &[i64],
    ) -> Result<HashMap<i64, CatalogItem>, ServiceError> {
        let wanted: BTreeSet<i64> = item_ids.iter().copied().collect();

        let rows = ItemEntity::find()
            .filter(item::Column::Id.is_in(wanted.iter().copied()))
            .all(&*self.db)
            .await?;

        let resolved: HashMap<i64, CatalogItem> = rows
            .into_iter()
            .map(|row| {
                (
                    row.id,
                    CatalogItem {
                        name: row.name,
                        cost: row.cost,
                    },
                )
            })
            .collect();

        let missing: Vec<i64> = wanted
            .iter()
            .copied()
            .filter(|id| !resolved.contains_key(id))
            .collect();

        if !missing.is_empty() {
            return Err(ServiceError::InvalidReference(format!(
                "Unknown item id(s): {}",
                missing
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        Ok(resolved)
    }
}
