//! Order submission and retrieval.
//!
//! Submission recomputes every amount from catalog prices; the client's
//! total is a display hint that must agree with the server's quote. The
//! order row, its items, and the cart clear all commit in one transaction.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::auth;
use crate::api::products::{ListParams, PaginatedResponse};
use crate::domain::aggregates::order::{self, DeliveryAddress, OrderDraft, OrderStatus, PaymentKind};
use crate::domain::events::OrderEvent;
use crate::domain::pricing::{self, DeliveryOption, ItemSize, LineItem, PricingBreakdown};
use crate::domain::value_objects::Money;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub tax: i64,
    pub total: i64,
    pub currency: String,
    pub delivery_option: String,
    pub payment_method: String,
    pub shipping_address: serde_json::Value,
    #[serde(skip_serializing)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub size: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub discount_percent: i32,
    pub line_total: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: DeliveryAddress,
    #[serde(default)]
    pub delivery_option: DeliveryOption,
    pub payment_method: PaymentKind,
    #[serde(alias = "total_price")]
    pub expected_total: Option<i64>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub size: ItemSize,
    #[serde(default)]
    pub discount_percent: u8,
}

#[derive(Debug, Serialize)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub order_number: String,
    pub status: String,
    pub totals: PricingBreakdown,
    pub estimated_delivery_at: DateTime<Utc>,
}

/// Prices come from the catalog, never from the client payload.
async fn authoritative_lines(
    s: &AppState,
    items: &[OrderItemRequest],
) -> Result<Vec<LineItem>, ApiError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            return Err(ApiError::Unprocessable("quantity must be at least 1".into()));
        }
        let product: Option<(String, i64, String)> =
            sqlx::query_as("SELECT name, price, currency FROM products WHERE id = $1 AND status = 'active'")
                .bind(item.product_id)
                .fetch_optional(&s.db)
                .await?;
        let Some((name, price, currency)) = product else {
            return Err(ApiError::Unprocessable(format!("unknown product {}", item.product_id)));
        };
        lines.push(LineItem {
            product_id: item.product_id,
            name,
            unit_price: Money::new(price, &currency),
            quantity: item.quantity,
            size: item.size,
            discount_percent: item.discount_percent,
        });
    }
    Ok(lines)
}

fn confirmation_from_row(row: OrderRow) -> Result<OrderConfirmation, ApiError> {
    let delivery = DeliveryOption::parse(&row.delivery_option)
        .ok_or_else(|| anyhow::anyhow!("unrecognized stored delivery option {:?}", row.delivery_option))?;
    Ok(OrderConfirmation {
        order_id: row.id,
        order_number: row.order_number,
        status: row.status,
        totals: PricingBreakdown {
            subtotal: Money::new(row.subtotal, &row.currency),
            delivery_fee: Money::new(row.delivery_fee, &row.currency),
            tax: Money::new(row.tax, &row.currency),
            total: Money::new(row.total, &row.currency),
        },
        estimated_delivery_at: row.created_at + Duration::minutes(delivery.estimated_minutes()),
    })
}

async fn find_by_idempotency_key(
    s: &AppState,
    user_id: Uuid,
    key: &str,
) -> Result<Option<OrderRow>, ApiError> {
    Ok(sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE idempotency_key = $1 AND user_id = $2",
    )
    .bind(key)
    .bind(user_id)
    .fetch_optional(&s.db)
    .await?)
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderConfirmation>), ApiError> {
    if r.items.is_empty() {
        return Err(ApiError::Unprocessable("order must contain at least one item".into()));
    }

    if let Some(key) = r.idempotency_key.as_deref() {
        if let Some(existing) = find_by_idempotency_key(&s, r.user_id, key).await? {
            return Ok((StatusCode::OK, Json(confirmation_from_row(existing)?)));
        }
    }

    let lines = authoritative_lines(&s, &r.items).await?;
    let draft = OrderDraft::new(
        r.user_id,
        lines,
        r.shipping_address,
        r.delivery_option,
        r.payment_method,
    )?;

    if let Some(expected) = r.expected_total {
        if expected != draft.totals.total.amount() {
            return Err(ApiError::Unprocessable(format!(
                "total mismatch: client sent {}, server computed {}",
                expected,
                draft.totals.total.amount()
            )));
        }
    }

    let address_json = serde_json::to_value(&draft.address).map_err(anyhow::Error::from)?;
    let estimated_delivery_at = draft.estimated_delivery_at();

    let mut tx = s.db.begin().await?;
    let inserted = sqlx::query_as::<_, OrderRow>(
        "INSERT INTO orders (id, order_number, user_id, status, subtotal, delivery_fee, tax, total, currency, delivery_option, payment_method, shipping_address, idempotency_key, created_at, updated_at)
         VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&draft.order_number)
    .bind(draft.user_id)
    .bind(draft.totals.subtotal.amount())
    .bind(draft.totals.delivery_fee.amount())
    .bind(draft.totals.tax.amount())
    .bind(draft.totals.total.amount())
    .bind(draft.totals.total.currency())
    .bind(draft.delivery_option.as_str())
    .bind(draft.payment.as_str())
    .bind(&address_json)
    .bind(r.idempotency_key.as_deref())
    .fetch_one(&mut *tx)
    .await;

    let order = match inserted {
        Ok(row) => row,
        // A concurrent submission with the same key won the race; serve
        // its order instead of failing.
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            tx.rollback().await?;
            if let Some(key) = r.idempotency_key.as_deref() {
                if let Some(existing) = find_by_idempotency_key(&s, r.user_id, key).await? {
                    return Ok((StatusCode::OK, Json(confirmation_from_row(existing)?)));
                }
            }
            return Err(ApiError::Conflict("duplicate order submission".into()));
        }
        Err(e) => return Err(e.into()),
    };

    for line in &draft.lines {
        let line_total = pricing::line_total(line)?;
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, name, size, quantity, unit_price, discount_percent, line_total)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(line.product_id)
        .bind(&line.name)
        .bind(line.size.as_str())
        .bind(line.quantity as i32)
        .bind(line.unit_price.amount())
        .bind(line.discount_percent as i32)
        .bind(line_total.amount())
        .execute(&mut *tx)
        .await?;
    }
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(draft.user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    s.publish(&OrderEvent::Created {
        order_id: order.id,
        order_number: order.order_number.clone(),
        user_id: order.user_id,
        total: order.total,
        currency: order.currency.clone(),
    })
    .await;

    tracing::info!(order_id = %order.id, order_number = %order.order_number, total = order.total, "order created");

    Ok((
        StatusCode::CREATED,
        Json(OrderConfirmation {
            order_id: order.id,
            order_number: order.order_number,
            status: order.status,
            totals: draft.totals,
            estimated_delivery_at,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
}

pub async fn list_for_user(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<OrderWithItems>>, ApiError> {
    let orders = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&s.db)
    .await?;
    let mut out = Vec::with_capacity(orders.len());
    for order in orders {
        let items = sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE order_id = $1")
            .bind(order.id)
            .fetch_all(&s.db)
            .await?;
        out.push(OrderWithItems { order, items });
    }
    Ok(Json(out))
}

pub async fn admin_list(
    State(s): State<AppState>,
    headers: HeaderMap,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<OrderRow>>, ApiError> {
    auth::require_bearer(&s.config.jwt_secret, &headers)?;
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).min(100);
    let orders = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(per_page as i64)
    .bind(((page - 1) * per_page) as i64)
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(&s.db).await?;
    Ok(Json(PaginatedResponse { data: orders, total: total.0, page }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn admin_update_status(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateStatusRequest>,
) -> Result<Json<OrderRow>, ApiError> {
    auth::require_bearer(&s.config.jwt_secret, &headers)?;
    let next = OrderStatus::parse(&r.status)
        .ok_or_else(|| ApiError::Validation(format!("unknown status {:?}", r.status)))?;
    let existing = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    let current = OrderStatus::parse(&existing.status)
        .ok_or_else(|| anyhow::anyhow!("unrecognized stored status {:?}", existing.status))?;
    order::transition(current, next)?;
    let updated = sqlx::query_as::<_, OrderRow>(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(next.as_str())
    .fetch_one(&s.db)
    .await?;

    s.publish(&OrderEvent::StatusChanged { order_id: id, from: current, to: next }).await;
    tracing::info!(order_id = %id, from = %current, to = %next, "order status changed");

    Ok(Json(updated))
}
