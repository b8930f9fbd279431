// REST API handlers for the document circuit engine
// Thin adapters: extract, call WorkflowEngine, serialize

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::debug;

use super::types::{
    ApiError, AssignCircuitRequest, ChecklistItemRequest, CircuitSummary, HealthResponse,
    ProcessActionRequest, ReturnToPreviousRequest,
};
use crate::engine::WorkflowEngine;
use crate::models::{
    Action, ChecklistEntry, Circuit, CircuitId, DocumentId, DocumentWorkflowState, StatusItemId,
    TransitionRecord,
};

/// Shared application state for the REST API
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<WorkflowEngine>,
}

impl ApiState {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine }
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Health check endpoint - GET /health
pub async fn health_check(State(state): State<ApiState>) -> ApiResult<Json<HealthResponse>> {
    let circuits = state.engine.list_circuits().await?.len();

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        circuits,
    }))
}

/// GET /circuits
pub async fn list_circuits(State(state): State<ApiState>) -> ApiResult<Json<Vec<CircuitSummary>>> {
    let circuits = state.engine.list_circuits().await?;
    Ok(Json(circuits.iter().map(CircuitSummary::from).collect()))
}

/// GET /circuits/:circuit_id
pub async fn get_circuit(
    State(state): State<ApiState>,
    Path(circuit_id): Path<CircuitId>,
) -> ApiResult<Json<Circuit>> {
    Ok(Json(state.engine.circuit(&circuit_id).await?))
}

/// POST /documents/:document_id/assignment
pub async fn assign_circuit(
    State(state): State<ApiState>,
    Path(document_id): Path<DocumentId>,
    Json(request): Json<AssignCircuitRequest>,
) -> ApiResult<(StatusCode, Json<DocumentWorkflowState>)> {
    let assigned = state
        .engine
        .assign_circuit(&document_id, &request.circuit_id, request.comments)
        .await?;
    Ok((StatusCode::CREATED, Json(assigned)))
}

/// POST /documents/:document_id/actions
pub async fn process_action(
    State(state): State<ApiState>,
    Path(document_id): Path<DocumentId>,
    Json(request): Json<ProcessActionRequest>,
) -> ApiResult<Json<DocumentWorkflowState>> {
    debug!(
        document_id = %document_id,
        action_id = %request.action_id,
        is_approved = request.is_approved,
        user_id = %request.user_id,
        "Action submitted"
    );

    let actor = request.actor();
    let updated = state
        .engine
        .process_action(
            &document_id,
            &request.action_id,
            request.is_approved,
            request.comments,
            &actor,
        )
        .await?;
    Ok(Json(updated))
}

/// POST /documents/:document_id/return
pub async fn return_to_previous_step(
    State(state): State<ApiState>,
    Path(document_id): Path<DocumentId>,
    Json(request): Json<ReturnToPreviousRequest>,
) -> ApiResult<Json<DocumentWorkflowState>> {
    let actor = request.actor();
    let updated = state
        .engine
        .return_to_previous_step(&document_id, &actor, request.comments)
        .await?;
    Ok(Json(updated))
}

/// GET /documents/:document_id/state
pub async fn get_state(
    State(state): State<ApiState>,
    Path(document_id): Path<DocumentId>,
) -> ApiResult<Json<DocumentWorkflowState>> {
    Ok(Json(state.engine.current_state(&document_id).await?))
}

/// GET /documents/:document_id/history
pub async fn get_history(
    State(state): State<ApiState>,
    Path(document_id): Path<DocumentId>,
) -> ApiResult<Json<Vec<TransitionRecord>>> {
    let history = state.engine.history(&document_id).await?;
    Ok(Json(history.to_vec()))
}

/// GET /documents/:document_id/eligible-actions
pub async fn get_eligible_actions(
    State(state): State<ApiState>,
    Path(document_id): Path<DocumentId>,
) -> ApiResult<Json<Vec<Action>>> {
    Ok(Json(state.engine.eligible_actions(&document_id).await?))
}

/// GET /documents/:document_id/checklist
pub async fn get_checklist(
    State(state): State<ApiState>,
    Path(document_id): Path<DocumentId>,
) -> ApiResult<Json<Vec<ChecklistEntry>>> {
    Ok(Json(state.engine.checklist(&document_id).await?))
}

/// PUT /documents/:document_id/checklist/:status_item_id
pub async fn set_checklist_item(
    State(state): State<ApiState>,
    Path((document_id, status_item_id)): Path<(DocumentId, StatusItemId)>,
    Json(request): Json<ChecklistItemRequest>,
) -> ApiResult<Json<ChecklistEntry>> {
    let entry = state
        .engine
        .set_checklist_item(&document_id, &status_item_id, request.is_complete, request.comments)
        .await?;
    Ok(Json(entry))
}

/// Error handler for invalid routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "code": "not_found",
                "category": "precondition",
                "message": "Not found"
            }
        })),
    )
}
