// REST API module
// Exposes WorkflowEngine operations over HTTP

//! # REST API
//!
//! ```text
//! GET  /health
//! GET  /circuits
//! GET  /circuits/:circuit_id
//! POST /documents/:document_id/assignment
//! POST /documents/:document_id/actions
//! POST /documents/:document_id/return
//! GET  /documents/:document_id/state
//! GET  /documents/:document_id/history
//! GET  /documents/:document_id/eligible-actions
//! GET  /documents/:document_id/checklist
//! PUT  /documents/:document_id/checklist/:status_item_id
//! ```
//!
//! Engine errors become `{"error": {"code", "category", "message", "details"}}`
//! with a status code chosen by [`types::ApiError`].

pub mod types;
pub mod handlers;

#[cfg(test)]
mod handlers_tests;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub use handlers::ApiState;
use handlers::{
    assign_circuit, get_checklist, get_circuit, get_eligible_actions, get_history, get_state,
    health_check, list_circuits, not_found, process_action, return_to_previous_step,
    set_checklist_item,
};

use crate::engine::WorkflowEngine;
use crate::settings::ServerConfig;
use crate::WorkflowError;

/// Build the router with every route bound to `state`
pub fn create_router(state: ApiState, cors_enabled: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/circuits", get(list_circuits))
        .route("/circuits/:circuit_id", get(get_circuit))
        .route("/documents/:document_id/assignment", post(assign_circuit))
        .route("/documents/:document_id/actions", post(process_action))
        .route("/documents/:document_id/return", post(return_to_previous_step))
        .route("/documents/:document_id/state", get(get_state))
        .route("/documents/:document_id/history", get(get_history))
        .route("/documents/:document_id/eligible-actions", get(get_eligible_actions))
        .route("/documents/:document_id/checklist", get(get_checklist))
        .route(
            "/documents/:document_id/checklist/:status_item_id",
            put(set_checklist_item),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// HTTP server around a [`WorkflowEngine`]
pub struct ApiServer {
    config: ServerConfig,
    state: ApiState,
}

impl ApiServer {
    pub fn new(config: ServerConfig, engine: Arc<WorkflowEngine>) -> Self {
        Self {
            config,
            state: ApiState::new(engine),
        }
    }

    pub fn create_router(&self) -> Router {
        create_router(self.state.clone(), self.config.cors_enabled)
    }

    /// Serve until the process is stopped
    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.create_router();
        let addr = self.config.bind_address();
        let socket: std::net::SocketAddr = addr
            .parse()
            .map_err(|e| {
                WorkflowError::Configuration(format!("invalid bind address {}: {}", addr, e))
            })?;

        info!("Document circuit API listening on http://{}", addr);
        info!("CORS enabled: {}", self.config.cors_enabled);

        axum::Server::bind(&socket)
            .serve(app.into_make_service())
            .await?;

        Ok(())
    }
}
