use anyhow::{anyhow, Result};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::ApiError;
use super::validation::{validate_login, validate_register};
use crate::auth::{hash_password, verify_password, Caller};
use crate::db::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest, Role, User};
use crate::AppState;

/// Register a client, therapist or (when enabled) admin account
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    let role = validate_register(&request)?;

    if role == Role::Admin && !state.config.auth.allow_admin_registration {
        warn!(email = %request.email, "Rejected admin self-registration");
        return Err(ApiError::forbidden("Admin accounts cannot be self-registered"));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let id = User::create(&state.db, &request.email, &password_hash, role).await?;

    info!(user_id = id, %role, "Registered user");
    Ok(Json(MessageResponse::new("Registrado ok")))
}

/// Exchange credentials for a session token
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    validate_login(&request)?;

    let user = User::find_by_email(&state.db, &request.email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found").with_status(StatusCode::UNAUTHORIZED))?;

    if !verify_password(&request.password, &user.password_hash) {
        warn!(user_id = user.id, "Login failed: wrong password");
        return Err(ApiError::invalid_credentials("Invalid password"));
    }

    let token = state.tokens.issue(user.id, user.role)?;
    info!(user_id = user.id, role = %user.role, "User logged in");
    Ok(Json(LoginResponse { token }))
}

/// Make sure an admin account with these credentials exists.
///
/// Returns `true` when a new account was created. An existing account with the
/// same email is left untouched.
pub async fn ensure_admin_user(db: &sqlx::SqlitePool, email: &str, password: &str) -> Result<bool> {
    if let Some(existing) = User::find_by_email(db, email).await? {
        if existing.role != Role::Admin {
            warn!(
                user_id = existing.id,
                role = %existing.role,
                "Bootstrap admin email belongs to a non-admin account, leaving it unchanged"
            );
        }
        return Ok(false);
    }

    let password_hash =
        hash_password(password).map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    let id = User::create(db, email, &password_hash, Role::Admin).await?;

    info!(user_id = id, email, "Created admin user");
    Ok(true)
}

/// Bearer token from the `Authorization` header
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the caller from the bearer token before the handler runs
#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(&parts.headers)
            .ok_or_else(|| ApiError::unauthenticated("No token"))?;
        let caller = state.tokens.verify(token)?;
        Ok(caller)
    }
}
