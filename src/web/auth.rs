//! Registration, login and the bearer-token extractor.

use axum::Json;
use axum::extract::{FromRequestParts, State};
use axum::http::{StatusCode, header, request::Parts};
use serde::{Deserialize, Serialize};

use crate::db::now_ms;
use crate::error::{ApiError, ApiResult};
use crate::types::User;

use super::AppState;

/// The authenticated caller, resolved from the `Authorization` header.
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Expected a bearer token"))?;

        match state.db().session_user(token, now_ms()) {
            Ok(Some(user)) => Ok(AuthUser {
                user,
                token: token.to_string(),
            }),
            Ok(None) => Err(ApiError::unauthorized("Invalid or expired session")),
            Err(e) => Err(ApiError::from(e)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Create an account.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let name = req.name.trim();
    let email = req.email.trim();

    if name.is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    if email.is_empty() {
        return Err(ApiError::missing_field("email"));
    }
    if req.password.is_empty() {
        return Err(ApiError::missing_field("password"));
    }

    let user = state
        .db()
        .create_user(name, email, &req.password)
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state
        .db()
        .verify_credentials(req.email.trim(), &req.password)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let session = state
        .db()
        .create_session(user.id, state.config().session_ttl_hours)
        .map_err(ApiError::from)?;

    Ok(Json(LoginResponse {
        token: session.token,
        user,
    }))
}

/// Invalidate the caller's session.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .db()
        .delete_session(&auth.token)
        .map_err(ApiError::from)?;

    Ok(Json(serde_json::json!({ "status": "sucesso" })))
}
