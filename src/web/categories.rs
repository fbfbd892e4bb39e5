//! Category handlers.
//!
//! The detail view answers PermissionDenied (not NotFound) for a category
//! that exists but belongs to someone else, so monitoring can tell intrusion
//! attempts from stale links. Everything else is owner-scoped and answers
//! NotFound.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::db::categories::{CategoryPage, DEFAULT_COLOR};
use crate::error::{ApiError, ApiResult};
use crate::types::{Category, TaskDetail};

use super::AppState;
use super::auth::AuthUser;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    /// Page number as given in the query string; anything unparseable falls
    /// back to the first page.
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    pub category: Category,
    pub tasks: Vec<TaskDetail>,
}

pub async fn api_list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<CategoryPage>> {
    let page = params
        .page
        .as_deref()
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(1);

    let listing = state
        .db()
        .list_categories(auth.user.id, page)
        .map_err(ApiError::from)?;

    Ok(Json(listing))
}

pub async fn api_create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CategoryInput>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    let color = input.color.as_deref().unwrap_or(DEFAULT_COLOR);

    let category = state
        .db()
        .create_category(auth.user.id, name, color)
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn api_get_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(category_id): Path<i64>,
) -> ApiResult<Json<CategoryDetail>> {
    let category = state
        .db()
        .get_category_any_owner(category_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Category"))?;

    if category.user_id != auth.user.id {
        return Err(ApiError::permission_denied(
            "You do not have permission to view this category",
        ));
    }

    let tasks = state
        .db()
        .tasks_for_category(auth.user.id, category_id)
        .map_err(ApiError::from)?;

    Ok(Json(CategoryDetail { category, tasks }))
}

pub async fn api_update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(category_id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<Json<Category>> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    let color = input.color.as_deref().unwrap_or(DEFAULT_COLOR);

    let category = state
        .db()
        .update_category(auth.user.id, category_id, name, color)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Category"))?;

    Ok(Json(category))
}

pub async fn api_delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(category_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let deleted = state
        .db()
        .delete_category(auth.user.id, category_id)
        .map_err(ApiError::from)?;

    if !deleted {
        return Err(ApiError::not_found("Category"));
    }

    Ok(StatusCode::NO_CONTENT)
}
