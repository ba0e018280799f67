//! Account endpoints: signup, signin, password reset.
//!
//! Passwords are stored as Argon2id hashes; sessions are stateless HS256
//! JWTs. Signin failures return one uniform message so the response does
//! not reveal whether the email exists.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub phone: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    #[validate(email(message = "email is malformed"))]
    pub email: String,
    #[validate(length(min = 10, message = "phone must have at least 10 digits"))]
    pub phone: String,
    #[validate(length(min = 8, message = "password must have at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub current_password: String,
    #[validate(length(min = 8, message = "password must have at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserRow,
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<(), ApiError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| ApiError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::InvalidCredentials)
}

fn issue_token(secret: &str, user_id: Uuid) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("token signing failed: {e}")))
}

/// Bearer-token guard for admin endpoints.
pub fn require_bearer(secret: &str, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}

pub async fn signup(
    State(s): State<AppState>,
    Json(r): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    r.validate()?;
    let email = r.email.trim().to_lowercase();
    let password_hash = hash_password(&r.password)?;
    let inserted = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, email, phone, full_name, password_hash, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&email)
    .bind(r.phone.trim())
    .bind(r.full_name.trim())
    .bind(&password_hash)
    .fetch_one(&s.db)
    .await;
    let user = match inserted {
        Ok(u) => u,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::Conflict("an account with this email already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };
    let token = issue_token(&s.config.jwt_secret, user.id)?;
    tracing::info!(user_id = %user.id, "account created");
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn signin(
    State(s): State<AppState>,
    Json(r): Json<SigninRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = r.email.trim().to_lowercase();
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    verify_password(&r.password, &user.password_hash)?;
    let token = issue_token(&s.config.jwt_secret, user.id)?;
    Ok(Json(AuthResponse { token, user }))
}

pub async fn reset_password(
    State(s): State<AppState>,
    Json(r): Json<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    r.validate()?;
    let email = r.email.trim().to_lowercase();
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    verify_password(&r.current_password, &user.password_hash)?;
    let password_hash = hash_password(&r.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(user.id)
        .bind(&password_hash)
        .execute(&s.db)
        .await?;
    tracing::info!(user_id = %user.id, "password reset");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(verify_password("wrong password", &hash).is_err());
    }

    #[test]
    fn test_token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = issue_token("test-secret", user_id).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        let claims = require_bearer("test-secret", &headers).unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn test_bad_token_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer not-a-jwt".parse().unwrap());
        assert!(require_bearer("test-secret", &headers).is_err());

        let token = issue_token("secret-a", Uuid::new_v4()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        assert!(require_bearer("secret-b", &headers).is_err());
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(require_bearer("test-secret", &HeaderMap::new()).is_err());
    }
}
