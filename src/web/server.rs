//! HTTP server implementation.
//!
//! Builds the axum router and owns the shared application state.

use axum::{
    Router,
    response::Json,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::db::Database;
use crate::mailer::Mailer;

use super::{auth, categories, comments, notes, tasks};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
    mailer: Arc<dyn Mailer>,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Arc<Database>, mailer: Arc<dyn Mailer>, config: Arc<AppConfig>) -> Self {
        Self { db, mailer, config }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "nome_site": "Gerenciador de Tarefas",
        "versao": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    // Permissive CORS; the API is bearer-token based.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/versao", get(version))
        // Accounts
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        // Tasks
        .route("/api/painel", get(tasks::api_dashboard))
        .route(
            "/api/tasks",
            get(tasks::api_list_tasks).post(tasks::api_create_task),
        )
        .route("/api/tasks/archived", get(tasks::api_list_archived))
        .route(
            "/api/tasks/archived/export",
            get(tasks::api_export_archived),
        )
        .route("/api/tasks/import", post(tasks::api_import_tasks))
        .route(
            "/api/tasks/{task_id}",
            get(tasks::api_get_task)
                .put(tasks::api_update_task)
                .delete(tasks::api_delete_task),
        )
        .route("/api/tasks/{task_id}/archive", post(tasks::api_archive_task))
        // Checklist steps: state-changing verb only
        .route(
            "/api/steps/{step_id}/toggle",
            post(tasks::api_toggle_step).get(tasks::toggle_wrong_verb),
        )
        // Categories
        .route(
            "/api/categories",
            get(categories::api_list_categories).post(categories::api_create_category),
        )
        .route(
            "/api/categories/{category_id}",
            get(categories::api_get_category)
                .put(categories::api_update_category)
                .delete(categories::api_delete_category),
        )
        // Knowledge base
        .route(
            "/api/notes",
            get(notes::api_list_notes).post(notes::api_create_note),
        )
        .route(
            "/api/notes/{note_id}",
            get(notes::api_get_note)
                .put(notes::api_update_note)
                .delete(notes::api_delete_note),
        )
        // Comments
        .route("/api/comentarios", post(comments::api_submit_comment))
        // Add middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the specified port.
///
/// Returns a oneshot sender that can be used to signal shutdown,
/// and the actual address the server is bound to.
pub async fn start_server(
    state: AppState,
    port: u16,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Server listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Server shutting down");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
