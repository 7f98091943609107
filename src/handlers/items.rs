use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::item;
use crate::{errors::ServiceError, ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ItemsQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
    /// Only items at or below their minimum threshold
    #[serde(default)]
    pub low_stock: bool,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemResponse {
    pub id: i64,
    pub name: String,
    pub cost: Decimal,
    pub quantity: i32,
    pub min_threshold: i32,
    pub supplier: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub low_stock: bool,
}

impl From<item::Model> for ItemResponse {
    fn from(model: item::Model) -> Self {
        let low_stock = model.quantity <= model.min_threshold;
        Self {
            id: model.id,
            name: model.name,
            cost: model.cost,
            quantity: model.quantity,
            min_threshold: model.min_threshold,
            supplier: model.supplier,
            expiration_date: model.expiration_date,
            low_stock,
        }
    }
}

/// List catalog items with their on-hand stock
#[utoipa::path(
    get,
    path = "/api/v1/items",
    summary = "List items",
    description = "Paginated catalog and stock listing with optional name search and \
                   low-stock filtering",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("search" = Option<String>, Query, description = "Name search term"),
        ("low_stock" = Option<bool>, Query, description = "Only items at or below their minimum threshold"),
    ),
    responses(
        (status = 200, description = "Items retrieved", body = ApiResponse<PaginatedResponse<ItemResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<ItemResponse>>>, ServiceError> {
    let limit = query.limit.clamp(1, 100);
    let (items, total) = state
        .services
        .stock
        .list_items(query.page, limit, query.search.as_deref(), query.low_stock)
        .await?;

    let total_pages = total.div_ceil(limit);
    let items: Vec<ItemResponse> = items.into_iter().map(ItemResponse::from).collect();

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page: query.page,
        limit,
        total_pages,
    })))
}
