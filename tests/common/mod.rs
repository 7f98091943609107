//! Shared test harness: in-memory SQLite database, seeded accounts for each
//! role, and a router wired the same way as the production binary.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tower::ServiceExt;

use storefront_api::auth::{self, AuthConfig, AuthService, Role};
use storefront_api::entities::{item, user};
use storefront_api::events::EventSender;
use storefront_api::handlers::AppServices;
use storefront_api::migrator::Migrator;
use storefront_api::{config::AppConfig, AppState};

/// Connect to a fresh in-memory SQLite database and run all migrations.
/// The pool is pinned to a single connection so every query sees the same
/// in-memory database.
pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1);

    let db = Database::connect(opt)
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub async fn seed_item(
    db: &DatabaseConnection,
    name: &str,
    cost: Decimal,
    quantity: i32,
) -> item::Model {
    item::ActiveModel {
        name: Set(name.to_string()),
        cost: Set(cost),
        quantity: Set(quantity),
        min_threshold: Set(5),
        supplier: Set(None),
        expiration_date: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed item")
}

pub async fn seed_user(db: &DatabaseConnection, username: &str, role: Role) -> user::Model {
    let hash = auth::hash_password("correct horse battery staple").expect("hash password");
    user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(hash),
        first_name: Set(None),
        last_name: Set(None),
        email: Set(None),
        role: Set(role.to_string()),
        is_active: Set(true),
        last_login: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed user")
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        jwt_secret: "integration-test-secret-key-that-is-long-enough".to_string(),
        jwt_expiration: 3600,
        auth_issuer: "storefront-api".to_string(),
        auth_audience: "storefront-clients".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        log_level: "warn".to_string(),
        log_json: false,
        auto_migrate: false,
        cors_allowed_origins: None,
    }
}

/// A fully wired application over an in-memory database, with one seeded
/// account (and token) per role.
pub struct TestApp {
    pub router: Router,
    pub db: Arc<DatabaseConnection>,
    pub admin_token: String,
    pub keeper_token: String,
    pub viewer_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Arc::new(setup_db().await);
        let cfg = test_config();

        let auth_service = Arc::new(AuthService::new(
            AuthConfig::new(
                cfg.jwt_secret.clone(),
                cfg.auth_issuer.clone(),
                cfg.auth_audience.clone(),
                Duration::from_secs(cfg.jwt_expiration),
            ),
            db.clone(),
        ));

        let admin = seed_user(&db, "admin", Role::Admin).await;
        let keeper = seed_user(&db, "keeper", Role::GroceryKeeper).await;
        let viewer = seed_user(&db, "viewer", Role::Viewer).await;

        let admin_token = auth_service.generate_token(&admin).expect("admin token");
        let keeper_token = auth_service.generate_token(&keeper).expect("keeper token");
        let viewer_token = auth_service.generate_token(&viewer).expect("viewer token");

        let (event_tx, event_rx) = tokio::sync::mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        tokio::spawn(storefront_api::events::process_events(event_rx));

        let services = AppServices::new(db.clone(), Arc::new(event_sender.clone()));

        let app_state = AppState {
            db: db.clone(),
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .route("/health", get(storefront_api::health_check))
            .nest("/api/v1", storefront_api::api_v1_routes())
            .nest(
                "/auth",
                storefront_api::auth::auth_routes().with_state(auth_service.clone()),
            )
            .layer(axum::middleware::from_fn_with_state(
                auth_service,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: axum::http::Request<Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .with_state(app_state);

        Self {
            router,
            db,
            admin_token,
            keeper_token,
            viewer_token,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("route request")
    }
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body bytes")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json response")
}
