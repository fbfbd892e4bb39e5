//! Task handlers: CRUD, checklist toggling, archiving, dashboard,
//! CSV import and export.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::export;
use crate::import::{self, ImportError, UPLOAD_FIELD};
use crate::types::{DashboardSummary, Task, TaskDetail, TaskInput};

use super::AppState;
use super::auth::AuthUser;

/// Active (non-archived) tasks, newest first.
pub async fn api_list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<TaskDetail>>> {
    let tasks = state.db().list_tasks(auth.user.id).map_err(ApiError::from)?;
    Ok(Json(tasks))
}

pub async fn api_create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<TaskInput>,
) -> ApiResult<(StatusCode, Json<TaskDetail>)> {
    if input.title.trim().is_empty() {
        return Err(ApiError::missing_field("title"));
    }

    let task = state
        .db()
        .create_task(auth.user.id, &input)
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn api_get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<TaskDetail>> {
    let task = state
        .db()
        .get_task(auth.user.id, task_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    Ok(Json(task))
}

pub async fn api_update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<i64>,
    Json(input): Json<TaskInput>,
) -> ApiResult<Json<TaskDetail>> {
    if input.title.trim().is_empty() {
        return Err(ApiError::missing_field("title"));
    }

    let task = state
        .db()
        .update_task(auth.user.id, task_id, &input)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    Ok(Json(task))
}

pub async fn api_delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let deleted = state
        .db()
        .delete_task(auth.user.id, task_id)
        .map_err(ApiError::from)?;

    if !deleted {
        return Err(ApiError::not_found("Task"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Archive a completed task. Tasks that are not done are left untouched.
pub async fn api_archive_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Task>> {
    let task = state
        .db()
        .archive_task(auth.user.id, task_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    Ok(Json(task))
}

pub async fn api_list_archived(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<TaskDetail>>> {
    let tasks = state
        .db()
        .list_archived(auth.user.id)
        .map_err(ApiError::from)?;
    Ok(Json(tasks))
}

/// Dashboard counters and task lists.
pub async fn api_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<DashboardSummary>> {
    let today = chrono::Local::now().date_naive();
    let summary = state
        .db()
        .dashboard(auth.user.id, today)
        .map_err(ApiError::from)?;
    Ok(Json(summary))
}

/// Toggle one checklist step and report the reconciled task status.
pub async fn api_toggle_step(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(step_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let outcome = state
        .db()
        .toggle_step(auth.user.id, step_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Step"))?;

    Ok(Json(json!({
        "status": "sucesso",
        "etapa_concluida": outcome.step_completed,
        "tarefa_status": outcome.task_status.label(),
        "tarefa_status_code": outcome.task_status.as_str(),
        "tarefa_id": outcome.task_id,
    })))
}

/// Toggling is state-changing; reject reads with a structured error.
pub async fn toggle_wrong_verb() -> ApiError {
    ApiError::method_not_allowed()
}

/// Import tasks from an uploaded CSV file.
pub async fn api_import_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.to_string()))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(e.to_string()))?;
            upload = Some((filename, bytes.to_vec()));
        }
    }

    let (filename, bytes) = upload.ok_or_else(|| {
        ApiError::validation("Selecione o arquivo CSV").with_field(UPLOAD_FIELD)
    })?;

    let text = match import::validate_upload(&filename, &bytes) {
        Ok(text) => text,
        Err(ImportError::EmptyFile) => {
            return Ok(Json(json!({
                "status": "aviso",
                "created": 0,
                "message": ImportError::EmptyFile.to_string(),
            })));
        }
        Err(e) => {
            return Err(ApiError::validation(e.to_string()).with_field(UPLOAD_FIELD));
        }
    };

    let (parsed, issues) = import::parse_rows(&text);
    let created = state
        .db()
        .apply_import(auth.user.id, &parsed)
        .map_err(ApiError::from)?;

    let report = import::ImportReport { created, issues };

    Ok(Json(json!({
        "status": if report.is_success() { "sucesso" } else { "aviso" },
        "created": report.created,
        "message": report.message(),
        "issues": report.issues,
    })))
}

/// Download archived tasks as a CSV attachment.
pub async fn api_export_archived(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let rows = state
        .db()
        .archived_rows(auth.user.id)
        .map_err(ApiError::from)?;

    let bytes = export::write_archived_csv(&rows).map_err(ApiError::from)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::EXPORT_FILENAME),
            ),
        ],
        bytes,
    ))
}
