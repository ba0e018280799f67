//! Server-side cart endpoints.
//!
//! The cart is keyed `(user_id, product_id, size)`; adding an item a
//! shopper already has merges into the existing line instead of creating
//! a duplicate row.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pricing::{self, ItemSize, LineItem};
use crate::domain::value_objects::Money;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItemRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub size: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PricedCartRow {
    product_id: Uuid,
    name: String,
    price: i64,
    currency: String,
    size: String,
    quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub size: ItemSize,
    pub line_total: Money,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub subtotal: Money,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub size: ItemSize,
}

pub async fn add(
    State(s): State<AppState>,
    Json(r): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartItemRow>), ApiError> {
    if r.quantity == 0 {
        return Err(ApiError::Validation("quantity must be at least 1".into()));
    }
    let product: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND status = 'active'")
            .bind(r.product_id)
            .fetch_optional(&s.db)
            .await?;
    if product.is_none() {
        return Err(ApiError::Unprocessable(format!("unknown product {}", r.product_id)));
    }
    let item = sqlx::query_as::<_, CartItemRow>(
        "INSERT INTO cart_items (id, user_id, product_id, size, quantity, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
         ON CONFLICT (user_id, product_id, size)
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW()
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(r.user_id)
    .bind(r.product_id)
    .bind(r.size.as_str())
    .bind(r.quantity as i32)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CartView>, ApiError> {
    let rows = sqlx::query_as::<_, PricedCartRow>(
        "SELECT c.product_id, p.name, p.price, p.currency, c.size, c.quantity
         FROM cart_items c JOIN products p ON p.id = c.product_id
         WHERE c.user_id = $1 ORDER BY c.created_at",
    )
    .bind(user_id)
    .fetch_all(&s.db)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let size = ItemSize::parse(&row.size)
            .ok_or_else(|| anyhow::anyhow!("unrecognized stored size {:?}", row.size))?;
        let line = LineItem {
            product_id: row.product_id,
            name: row.name,
            unit_price: Money::new(row.price, &row.currency),
            quantity: row.quantity as u32,
            size,
            discount_percent: 0,
        };
        let line_total = pricing::line_total(&line)?;
        items.push(CartLineView {
            product_id: line.product_id,
            name: line.name.clone(),
            unit_price: line.unit_price.clone(),
            quantity: line.quantity,
            size: line.size,
            line_total,
        });
        lines.push(line);
    }
    let subtotal = pricing::subtotal(&lines)?;
    Ok(Json(CartView { items, subtotal }))
}

#[derive(Debug, Deserialize)]
pub struct AdjustQuantityRequest {
    #[serde(default)]
    pub size: ItemSize,
    pub delta: i32,
}

/// Same floor-of-one rule as `Cart::adjust_quantity`.
pub async fn adjust(
    State(s): State<AppState>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
    Json(r): Json<AdjustQuantityRequest>,
) -> Result<Json<CartItemRow>, ApiError> {
    let item = sqlx::query_as::<_, CartItemRow>(
        "UPDATE cart_items SET quantity = GREATEST(1, quantity + $4), updated_at = NOW()
         WHERE user_id = $1 AND product_id = $2 AND size = $3 RETURNING *",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(r.size.as_str())
    .bind(r.delta)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("cart item"))?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
pub struct RemoveParams {
    pub size: Option<String>,
}

/// Removing an absent line is a no-op, matching `Cart::remove`.
pub async fn remove(
    State(s): State<AppState>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
    Query(p): Query<RemoveParams>,
) -> Result<StatusCode, ApiError> {
    let size = match p.size.as_deref() {
        Some(raw) => ItemSize::parse(raw)
            .ok_or_else(|| ApiError::Validation(format!("unknown size {:?}", raw)))?,
        None => ItemSize::Regular,
    };
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2 AND size = $3")
        .bind(user_id)
        .bind(product_id)
        .bind(size.as_str())
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
