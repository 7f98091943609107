//! Seed the database with demo accounts and a starter catalog for local
//! development. Safe to re-run: seeding is skipped when data is present.

use anyhow::Result;
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use tracing::info;

use storefront_api::entities::{item, user};
use storefront_api::{auth, config, db};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let pool = db::establish_connection_from_app_config(&cfg).await?;
    db::run_migrations(&pool).await?;

    let user_count = user::Entity::find().count(&pool).await?;
    if user_count > 0 {
        info!("Users already present; skipping seed");
        return Ok(());
    }

    let accounts = [
        ("admin", "admin123", auth::Role::Admin),
        ("keeper", "keeper123", auth::Role::GroceryKeeper),
        ("viewer", "viewer123", auth::Role::Viewer),
    ];

    for (username, password, role) in accounts {
        let hash = auth::hash_password(password)
            .map_err(|e| anyhow::anyhow!("failed to hash seed password: {}", e))?;
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
        .insert(&pool)
        .await?;
        info!(username, role = %role, "Seeded user");
    }

    let items = [
        ("Basmati Rice 5kg", dec!(12.50), 40, 10),
        ("Whole Milk 1L", dec!(1.20), 120, 24),
        ("Free Range Eggs (12)", dec!(3.40), 60, 12),
        ("Sunflower Oil 1L", dec!(4.80), 30, 8),
        ("Wheat Flour 2kg", dec!(2.60), 50, 10),
    ];

    for (name, cost, quantity, min_threshold) in items {
        item::ActiveModel {
            name: Set(name.to_string()),
            cost: Set(cost),
            quantity: Set(quantity),
            min_threshold: Set(min_threshold),
            supplier: Set(None),
            expiration_date: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&pool)
        .await?;
        info!(name, "Seeded item");
    }

    info!("Seed complete");
    Ok(())
}
