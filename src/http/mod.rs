//! HTTP surface: routes, extractors and the response envelope

pub mod auth;
pub mod cart;
pub mod error;
pub mod orders;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::domain::ports::{CartRepository, CatalogReader, OrderRepository, UserDirectory};
use crate::infrastructure::EventSink;
use crate::services::{CartService, OrderService};

#[derive(Clone)]
pub struct AppState {
    pub carts: CartService,
    pub orders: OrderService,
}

impl AppState {
    /// Wires both services to a backend implementing every storage port.
    pub fn new<S>(store: Arc<S>, events: EventSink) -> Self
    where
        S: CatalogReader + UserDirectory + CartRepository + OrderRepository + 'static,
    {
        Self {
            carts: CartService::new(store.clone(), store.clone()),
            orders: OrderService::new(store.clone(), store.clone(), store.clone(), store, events),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cart = Router::new()
        .route("/", post(cart::add_to_cart).get(cart::get_cart))
        .route("/:product_id", put(cart::update_quantity).delete(cart::remove_from_cart));

    let orders = Router::new()
        .route("/", post(orders::create_order).get(orders::list_orders))
        .route("/:order_id", get(orders::order_details))
        .route("/admin/orders", get(orders::list_all_orders))
        .route("/admin/orders/:id", get(orders::get_order).delete(orders::delete_order))
        .route("/admin/orders/:id/status", put(orders::update_status));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-storefront"})) }))
        .nest("/api/cart", cart)
        .nest("/api/orders", orders)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
