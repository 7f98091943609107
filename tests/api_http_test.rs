//! Router-level tests: authentication, role gating per endpoint, and the
//! billing flow driven over HTTP exactly as a till client would.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

// ==================== Auth ====================

#[tokio::test]
async fn login_returns_token_for_valid_credentials() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "keeper", "password": "correct horse battery staple"})),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["username"], "keeper");
    assert_eq!(body["user"]["role"], "Grocery Keeper");
}

#[tokio::test]
async fn login_rejects_bad_password() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "keeper", "password": "wrong"})),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_echoes_the_token_identity() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/auth/me", Some(&app.admin_token), None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["username"], "admin");
    assert_eq!(body["role"], "Admin");
}

// ==================== Role gating ====================

#[tokio::test]
async fn items_require_authentication() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/items", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/items", Some(&app.viewer_token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn viewers_cannot_create_orders() {
    let app = TestApp::new().await;
    let item = common::seed_item(&app.db, "Item A", dec!(50.00), 10).await;

    let payload = json!({"items": [{"item_id": item.id, "qty": 1}]});

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&app.viewer_token),
            Some(payload),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cancellation_is_admin_only() {
    let app = TestApp::new().await;
    let item = common::seed_item(&app.db, "Item A", dec!(50.00), 10).await;

    let create = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&app.keeper_token),
            Some(json!({"items": [{"item_id": item.id, "qty": 1}]})),
        )
        .await;
    assert_eq!(create.status(), StatusCode::CREATED);
    let order_id = response_json(create).await["data"]["order_id"]
        .as_i64()
        .expect("order id");

    let keeper_cancel = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/cancel", order_id),
            Some(&app.keeper_token),
            None,
        )
        .await;
    assert_eq!(keeper_cancel.status(), StatusCode::FORBIDDEN);

    let admin_cancel = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/cancel", order_id),
            Some(&app.admin_token),
            None,
        )
        .await;
    assert_eq!(admin_cancel.status(), StatusCode::OK);
}

// ==================== Billing flow over HTTP ====================

#[tokio::test]
async fn full_billing_flow_over_http() {
    let app = TestApp::new().await;
    let a = common::seed_item(&app.db, "Item A", dec!(50.00), 10).await;
    let b = common::seed_item(&app.db, "Item B", dec!(30.00), 10).await;

    // Create the worked example order
    let create = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&app.keeper_token),
            Some(json!({
                "items": [
                    {"item_id": a.id, "qty": 2},
                    {"item_id": b.id, "qty": 1}
                ],
                "discount_amount": 10.00,
                "tax_percent": 5
            })),
        )
        .await;

    assert_eq!(create.status(), StatusCode::CREATED);
    let create_body = response_json(create).await;
    assert_eq!(create_body["data"]["total_amount"], "126.00");
    let order_id = create_body["data"]["order_id"].as_i64().unwrap();

    // Partial payment leaves the order draft
    let partial = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/pay", order_id),
            Some(&app.keeper_token),
            Some(json!({"method": "CARD", "amount": 100.00})),
        )
        .await;
    assert_eq!(partial.status(), StatusCode::OK);
    let partial_body = response_json(partial).await;
    assert_eq!(partial_body["data"]["status"], "DRAFT");
    assert_eq!(partial_body["data"]["due"], "26.00");

    // Remainder settles and issues the invoice in the same unit
    let settle = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/pay", order_id),
            Some(&app.keeper_token),
            Some(json!({
                "method": "CASH",
                "amount": 26.00,
                "generate_invoice": true
            })),
        )
        .await;
    assert_eq!(settle.status(), StatusCode::OK);
    let settle_body = response_json(settle).await;
    assert_eq!(settle_body["data"]["status"], "PAID");
    assert_eq!(settle_body["data"]["due"], "0.00");
    let invoice_number = settle_body["data"]["invoice_number"]
        .as_str()
        .expect("invoice issued")
        .to_string();
    assert!(invoice_number.starts_with("INV-"));

    // Paying again is rejected
    let again = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/pay", order_id),
            Some(&app.keeper_token),
            Some(json!({"method": "CASH", "amount": 1.00})),
        )
        .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);

    // Re-requesting the invoice returns the same number
    let reissue = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/invoice", order_id),
            Some(&app.keeper_token),
            None,
        )
        .await;
    assert_eq!(reissue.status(), StatusCode::OK);
    let reissue_body = response_json(reissue).await;
    assert_eq!(reissue_body["data"]["invoice_number"], invoice_number);

    // Full order view reflects everything
    let get = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            Some(&app.keeper_token),
            None,
        )
        .await;
    assert_eq!(get.status(), StatusCode::OK);
    let get_body = response_json(get).await;
    assert_eq!(get_body["data"]["order"]["status"], "PAID");
    assert_eq!(get_body["data"]["paid"], "126.00");
    assert_eq!(get_body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(get_body["data"]["payments"].as_array().unwrap().len(), 2);

    // Stock view reflects the decrement
    let items = app
        .request(
            Method::GET,
            "/api/v1/items?search=Item+A",
            Some(&app.viewer_token),
            None,
        )
        .await;
    let items_body = response_json(items).await;
    assert_eq!(items_body["data"]["items"][0]["quantity"], 8);
}

#[tokio::test]
async fn unknown_order_returns_404() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/orders/9999",
            Some(&app.keeper_token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_order_payload_returns_400() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&app.keeper_token),
            Some(json!({"items": []})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==================== Health ====================

#[tokio::test]
async fn health_reports_database_status() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}
