//! Visitor comments, forwarded by email to the site owner.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub nome: String,
    pub comentario: String,
}

/// Accept a comment and notify by email. Open to anonymous visitors.
pub async fn api_submit_comment(
    State(state): State<AppState>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let nome = req.nome.trim();
    let comentario = req.comentario.trim();

    if nome.is_empty() {
        return Err(ApiError::missing_field("nome"));
    }
    if comentario.is_empty() {
        return Err(ApiError::missing_field("comentario"));
    }

    let body = format!("Received comment from {}\n\n{}", nome, comentario);
    let mail = state.config().mail.clone();

    state
        .mailer()
        .send(&mail.from, &mail.to, "Received comment", &body)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(json!({
        "status": "sucesso",
        "message": "Comentário aceito",
    })))
}
