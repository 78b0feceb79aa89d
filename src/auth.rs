use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::RequestPartsExt;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::response::Json;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::User;
use crate::db::queries;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
}

/// Extractor for authenticated requests: validates the bearer token and
/// yields its claims.
impl FromRequestParts<AppState> for Claims {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::Auth("missing authorization token".into()))?;

        decode_token(bearer.token(), &state.config.jwt_secret)
    }
}

/// Optional authentication: `None` when no Authorization header is present,
/// an error when one is present but invalid.
pub struct MaybeUser(pub Option<Claims>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        if !parts.headers.contains_key(axum::http::header::AUTHORIZATION) {
            return Ok(MaybeUser(None));
        }
        Claims::from_request_parts(parts, state).await.map(|claims| MaybeUser(Some(claims)))
    }
}

pub fn issue_token(secret: &str, user: &User, expiry_minutes: i64) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.user_id,
        email: user.email.clone(),
        exp: (Utc::now() + Duration::minutes(expiry_minutes)).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to sign token: {e}")))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Auth("invalid or expired authorization token".into()))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to hash password: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = request.email.trim().to_ascii_lowercase();
    if !email.contains('@') {
        return Err(ApiError::Validation("a valid email address is required".into()));
    }
    if request.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }

    let password_hash = hash_password(&request.password)?;
    let user = queries::create_user(
        &state.db_pool,
        &email,
        &password_hash,
        request.full_name.as_deref(),
    )
    .await
    .map_err(|e| {
        if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
            ApiError::Validation("an account with this email already exists".into())
        } else {
            ApiError::storage(e)
        }
    })?;

    state
        .analytics
        .track_user_event(user.user_id, "user_registration", &user.email);

    let access_token = issue_token(
        &state.config.jwt_secret,
        &user,
        state.config.token_expiry_minutes,
    )?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        user_id: user.user_id,
        email: user.email,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = request.email.trim().to_ascii_lowercase();
    let user = queries::get_user_by_email(&state.db_pool, &email)
        .await
        .map_err(ApiError::storage)?
        .ok_or_else(|| ApiError::Auth("invalid email or password".into()))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::Auth("invalid email or password".into()));
    }

    state
        .analytics
        .track_user_event(user.user_id, "user_login", &user.email);

    let access_token = issue_token(
        &state.config.jwt_secret,
        &user,
        state.config.token_expiry_minutes,
    )?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        user_id: user.user_id,
        email: user.email,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<UserProfile>, ApiError> {
    let user = queries::get_user(&state.db_pool, claims.sub)
        .await
        .map_err(ApiError::storage)?
        .ok_or_else(|| ApiError::Auth("account no longer exists".into()))?;

    Ok(Json(UserProfile {
        user_id: user.user_id,
        email: user.email,
        full_name: user.full_name,
        created_at: user.created_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_token_round_trip() {
        let user = User {
            user_id: Uuid::new_v4(),
            email: "tenant@example.com".to_string(),
            password_hash: String::new(),
            full_name: None,
            created_at: Utc::now(),
        };
        let token = issue_token("test-secret", &user, 30).unwrap();
        let claims = decode_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, user.user_id);
        assert_eq!(claims.email, user.email);

        assert!(decode_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "old@example.com".to_string(),
            exp: (Utc::now() - Duration::hours(1)).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(decode_token(&token, "test-secret").is_err());
    }
}
