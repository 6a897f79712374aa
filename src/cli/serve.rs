//! HTTP front end
//!
//! `POST /api/kill-query` runs the same pipeline as `querykill kill` and
//! answers `200` with the JSON report plus the `exit_code` the CLI would have
//! returned. Every request opens and closes its own MySQL connection.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::commands::{
    execute_kill, resolve_request, resolve_server, AuditSelection, ConnectionArgs, KillInput,
};
use crate::config::Config;
use crate::core::{ArgumentError, Report};

/// Body of `POST /api/kill-query`
#[derive(Debug, Default, Deserialize)]
pub struct KillQueryBody {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub query: Option<String>,
    pub killed_by_user: Option<String>,
    pub mode: Option<String>,
    pub case_sensitive: Option<bool>,
    pub already_gone: Option<String>,
}

/// The report as the CLI would print it, plus its exit code
#[derive(Debug, Serialize)]
pub struct KillQueryResponse {
    #[serde(flatten)]
    pub report: Report,
    pub exit_code: i32,
}

impl From<Report> for KillQueryResponse {
    fn from(report: Report) -> Self {
        let exit_code = report.exit_code();
        Self { report, exit_code }
    }
}

struct AppState {
    config: Config,
    audit: AuditSelection,
}

/// Build the HTTP router
pub fn router(config: Config, audit: AuditSelection) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/kill-query", post(kill_query_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(AppState { config, audit }))
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM
pub async fn serve(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn kill_query_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<KillQueryBody>, JsonRejection>,
) -> Json<KillQueryResponse> {
    let report = match body {
        Ok(Json(body)) => kill_query(&state, body).await,
        Err(rejection) => Report::argument_error(&ArgumentError::Invalid {
            field: "body",
            reason: rejection.body_text(),
        }),
    };

    info!("kill-query finished with {}", report.status.as_str());
    Json(report.into())
}

async fn kill_query(state: &AppState, body: KillQueryBody) -> Report {
    let connection = ConnectionArgs {
        host: body.host,
        port: body.port,
        user: body.user,
        password: body.password,
    };
    let input = KillInput {
        query: body.query,
        killed_by: body.killed_by_user,
        mode: body.mode,
        case_sensitive: body
            .case_sensitive
            .unwrap_or(state.config.matching.case_sensitive),
        already_gone: body.already_gone,
    };

    let resolved = resolve_server(&state.config, &connection).and_then(|settings| {
        let request = resolve_request(&state.config, &settings, input)?;
        Ok((settings, request))
    });

    match resolved {
        Ok((settings, request)) => execute_kill(&settings, &request, &state.audit).await,
        Err(e) => Report::argument_error(&e),
    }
}
