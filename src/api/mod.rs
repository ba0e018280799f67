//! HTTP surface.

pub mod auth;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod products;

use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/products", get(products::list).post(products::create))
        .route("/api/products/featured", get(products::featured))
        .route("/api/products/search", get(products::search))
        .route("/api/products/category/:id", get(products::by_category))
        .route(
            "/api/products/:id",
            get(products::get).put(products::update).delete(products::archive),
        )
        .route("/api/categories", get(categories::list).post(categories::create))
        .route("/api/categories/:id", get(categories::get))
        .route("/api/cart/add", post(cart::add))
        .route("/api/cart/:user_id", get(cart::get).delete(cart::clear))
        .route(
            "/api/cart/:user_id/items/:product_id",
            put(cart::adjust).delete(cart::remove),
        )
        .route("/api/orders", post(orders::create))
        .route("/api/orders/:user_id", get(orders::list_for_user))
        .route("/api/admin/orders", get(orders::admin_list))
        .route("/api/admin/orders/:id/status", put(orders::admin_update_status))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/signin", post(auth::signin))
        .route("/auth/reset-password", post(auth::reset_password))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "isoko-storefront" }))
}
