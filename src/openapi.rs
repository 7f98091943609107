use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Storefront API",
        version = "0.3.0",
        description = r#"
# Storefront Billing API

Point-of-sale backend for a single retail store: draft orders built from the
catalog, partial payments with exactly-once settlement, idempotent invoice
issuance, and stock that stays reconciled with both.

## Authentication

All `/api/v1` endpoints require a bearer token from `/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

Order and payment mutation requires the Grocery Keeper role or above;
cancellation requires Admin.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order, payment and invoice endpoints"),
        (name = "Items", description = "Catalog and stock endpoints"),
        (name = "Auth", description = "Authentication endpoints")
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::pay_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::issue_invoice,
        crate::handlers::items::list_items,
        crate::auth::login_handler,
        crate::auth::me_handler,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,

            // Order types
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::OrderLineRequest,
            crate::services::orders::CreateOrderResponse,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderDetailResponse,
            crate::services::orders::CancelOrderResponse,
            crate::services::orders::OrderStatus,

            // Payment types
            crate::services::payments::AddPaymentRequest,
            crate::services::payments::PaymentOutcome,
            crate::services::payments::PaymentMethod,
            crate::handlers::orders::InvoiceResponse,

            // Items types
            crate::handlers::items::ItemResponse,

            // Auth types
            crate::auth::LoginCredentials,
            crate::auth::LoginResponse,
            crate::auth::Role,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_doc_includes_billing_paths() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/orders/{id}/pay"));
        assert!(json.contains("/auth/login"));
    }
}
