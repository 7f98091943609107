pub mod items;
pub mod orders;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    catalog::CatalogService, invoicing::InvoicingService, orders::OrderService,
    payments::PaymentService, stock::StockService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub invoicing: Arc<InvoicingService>,
    pub stock: Arc<StockService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let catalog = Arc::new(CatalogService::new(db_pool.clone()));
        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            catalog.clone(),
            Some(event_sender.clone()),
        ));
        let payments = Arc::new(PaymentService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let invoicing = Arc::new(InvoicingService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let stock = Arc::new(StockService::new(db_pool));

        Self {
            catalog,
            orders,
            payments,
            invoicing,
            stock,
        }
    }
}
