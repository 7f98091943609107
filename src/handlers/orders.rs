use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::services::orders::{
    CancelOrderResponse, CreateOrderRequest, CreateOrderResponse, OrderDetailResponse,
};
use crate::services::payments::{AddPaymentRequest, PaymentOutcome};
use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceResponse {
    pub order_id: i64,
    pub invoice_number: String,
}

/// Create a new draft order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Create a draft order from catalog items, snapshotting names and prices",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<CreateOrderResponse>),
        (status = 400, description = "Empty order or unknown item", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateOrderResponse>>), ServiceError> {
    let created = state
        .services
        .orders
        .create_order(auth_user.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// Get one order with its lines and payment history
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderDetailResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderDetailResponse>>, ServiceError> {
    let detail = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// Record a payment against an order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/pay",
    summary = "Add payment",
    description = "Record a payment; when cumulative payments reach the total the order \
                   settles, stock is decremented, and an invoice can be issued in the same \
                   unit of work",
    params(("id" = i64, Path, description = "Order ID")),
    request_body = AddPaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = ApiResponse<PaymentOutcome>),
        (status = 400, description = "Invalid amount, already paid, or cancelled", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn pay_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AddPaymentRequest>,
) -> Result<Json<ApiResponse<PaymentOutcome>>, ServiceError> {
    let outcome = state.services.payments.add_payment(id, request).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Cancel an order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    summary = "Cancel order",
    description = "Cancel an order; cancelling a paid order restores stock. Re-cancelling \
                   is a no-op success",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<CancelOrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CancelOrderResponse>>, ServiceError> {
    let outcome = state.services.orders.cancel_order(id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Issue (or re-fetch) the invoice for a settled order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/invoice",
    summary = "Issue invoice",
    description = "Idempotently issue the invoice for a fully paid order",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Invoice issued or already present", body = ApiResponse<InvoiceResponse>),
        (status = 400, description = "Order not settled", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn issue_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<InvoiceResponse>>, ServiceError> {
    let invoice_number = state.services.invoicing.issue_invoice(id).await?;
    Ok(Json(ApiResponse::success(InvoiceResponse {
        order_id: id,
        invoice_number,
    })))
}
