//! Category endpoints.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::auth;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn list(State(s): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(&s.db)
        .await?;
    Ok(Json(categories))
}

pub async fn get(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Category>, ApiError> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("category"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub image_url: Option<String>,
}

pub async fn create(
    State(s): State<AppState>,
    headers: HeaderMap,
    Json(r): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    auth::require_bearer(&s.config.jwt_secret, &headers)?;
    r.validate()?;
    let slug = r.name.trim().to_lowercase().replace(' ', "-");
    let c = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, slug, image_url, created_at) VALUES ($1, $2, $3, $4, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(r.name.trim())
    .bind(&slug)
    .bind(&r.image_url)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(c)))
}
