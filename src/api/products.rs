//! Product catalog endpoints.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::auth;
use crate::domain::value_objects::DEFAULT_CURRENCY;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub currency: String,
    pub category_id: Option<Uuid>,
    pub featured: bool,
    pub image_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)] pub struct ListParams { pub page: Option<u32>, pub per_page: Option<u32> }
#[derive(Debug, Serialize)] pub struct PaginatedResponse<T> { pub data: Vec<T>, pub total: i64, pub page: u32 }
#[derive(Debug, Deserialize)] pub struct SearchParams { pub query: String }

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Product>>, ApiError> {
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).min(100);
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE status = 'active' ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(per_page as i64)
    .bind(((page - 1) * per_page) as i64)
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE status = 'active'")
        .fetch_one(&s.db)
        .await?;
    Ok(Json(PaginatedResponse { data: products, total: total.0, page }))
}

pub async fn featured(State(s): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE status = 'active' AND featured ORDER BY created_at DESC",
    )
    .fetch_all(&s.db)
    .await?;
    Ok(Json(products))
}

pub async fn by_category(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE status = 'active' AND category_id = $1 ORDER BY name",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(products))
}

pub async fn search(
    State(s): State<AppState>,
    Query(p): Query<SearchParams>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE status = 'active' AND name ILIKE '%' || $1 || '%' ORDER BY name",
    )
    .bind(p.query.trim())
    .fetch_all(&s.db)
    .await?;
    Ok(Json(products))
}

pub async fn get(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>, ApiError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("product"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertProductRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "price cannot be negative"))]
    pub price: i64,
    pub currency: Option<String>,
    pub category_id: Option<Uuid>,
    pub featured: Option<bool>,
    pub image_url: Option<String>,
}

pub async fn create(
    State(s): State<AppState>,
    headers: HeaderMap,
    Json(r): Json<UpsertProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    auth::require_bearer(&s.config.jwt_secret, &headers)?;
    r.validate()?;
    let p = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, price, currency, category_id, featured, image_url, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active', NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(r.name.trim())
    .bind(&r.description)
    .bind(r.price)
    .bind(r.currency.as_deref().unwrap_or(DEFAULT_CURRENCY))
    .bind(r.category_id)
    .bind(r.featured.unwrap_or(false))
    .bind(&r.image_url)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(p)))
}

pub async fn update(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(r): Json<UpsertProductRequest>,
) -> Result<Json<Product>, ApiError> {
    auth::require_bearer(&s.config.jwt_secret, &headers)?;
    r.validate()?;
    let p = sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, description = $3, price = $4, category_id = $5, featured = $6, image_url = $7, updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(r.name.trim())
    .bind(&r.description)
    .bind(r.price)
    .bind(r.category_id)
    .bind(r.featured.unwrap_or(false))
    .bind(&r.image_url)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("product"))?;
    Ok(Json(p))
}

/// Soft delete; archived products stay referenced by past orders.
pub async fn archive(
    State(s): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    auth::require_bearer(&s.config.jwt_secret, &headers)?;
    sqlx::query("UPDATE products SET status = 'archived', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
