pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod use_cases;
pub mod validation;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsOrigins;
use crate::health::{DependencyChecker, StoreChecker};
use crate::ports::{MarketStore, NotificationSink};
use crate::services::{CartService, OrderQueryService};
use crate::use_cases::{PlaceOrder, ReconcilePayment, UpdateOrderStatus};

#[derive(Clone)]
pub struct AppState {
    pub cart: CartService,
    pub orders: OrderQueryService,
    pub place_order: Arc<PlaceOrder>,
    pub reconcile_payment: Arc<ReconcilePayment>,
    pub update_status: Arc<UpdateOrderStatus>,
    pub health: Arc<dyn DependencyChecker>,
    pub started_at: Instant,
}

impl AppState {
    /// Wires every service and workflow onto one store and notification sink.
    pub fn new(store: Arc<dyn MarketStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            cart: CartService::new(store.clone()),
            orders: OrderQueryService::new(store.clone()),
            place_order: Arc::new(PlaceOrder::new(store.clone(), notifier.clone())),
            reconcile_payment: Arc::new(ReconcilePayment::new(store.clone(), notifier)),
            update_status: Arc::new(UpdateOrderStatus::new(store.clone())),
            health: Arc::new(StoreChecker::new(store)),
            started_at: Instant::now(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/cart",
            get(handlers::cart::list_cart)
                .post(handlers::cart::add_to_cart)
                .delete(handlers::cart::clear_cart),
        )
        .route(
            "/api/cart/:id",
            put(handlers::cart::update_cart_item).delete(handlers::cart::remove_cart_item),
        )
        .route(
            "/api/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/api/orders/:id", get(handlers::orders::get_order))
        .route(
            "/api/orders/:id/status",
            put(handlers::orders::update_order_status),
        )
        .route(
            "/api/orders/:id/payment",
            put(handlers::orders::update_payment_status),
        )
        .layer(axum::middleware::from_fn(
            middleware::request_logger_middleware,
        ))
        .with_state(state)
}

pub fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let origins: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(origins)
        }
    }
}
