//! Knowledge-base note handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::types::KnowledgeNote;

use super::AppState;
use super::auth::AuthUser;

#[derive(Debug, Deserialize)]
pub struct NoteInput {
    pub title: String,
    #[serde(default)]
    pub content_markdown: String,
}

pub async fn api_list_notes(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<KnowledgeNote>>> {
    let notes = state.db().list_notes(auth.user.id).map_err(ApiError::from)?;
    Ok(Json(notes))
}

pub async fn api_create_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<NoteInput>,
) -> ApiResult<(StatusCode, Json<KnowledgeNote>)> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(ApiError::missing_field("title"));
    }

    let note = state
        .db()
        .create_note(auth.user.id, title, &input.content_markdown)
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn api_get_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(note_id): Path<i64>,
) -> ApiResult<Json<KnowledgeNote>> {
    let note = state
        .db()
        .get_note(auth.user.id, note_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Note"))?;

    Ok(Json(note))
}

pub async fn api_update_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(note_id): Path<i64>,
    Json(input): Json<NoteInput>,
) -> ApiResult<Json<KnowledgeNote>> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(ApiError::missing_field("title"));
    }

    let note = state
        .db()
        .update_note(auth.user.id, note_id, title, &input.content_markdown)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Note"))?;

    Ok(Json(note))
}

pub async fn api_delete_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(note_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let deleted = state
        .db()
        .delete_note(auth.user.id, note_id)
        .map_err(ApiError::from)?;

    if !deleted {
        return Err(ApiError::not_found("Note"));
    }

    Ok(StatusCode::NO_CONTENT)
}
