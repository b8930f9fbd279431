// REST API request, response and error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::models::{ActionId, Actor, Circuit, CircuitId, Role, UserId};
use crate::{ErrorCategory, WorkflowError};

/// Body of `POST /documents/:document_id/assignment`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignCircuitRequest {
    pub circuit_id: CircuitId,
    #[serde(default)]
    pub comments: Option<String>,
}

/// Body of `POST /documents/:document_id/actions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessActionRequest {
    pub action_id: ActionId,
    pub is_approved: bool,
    #[serde(default)]
    pub comments: Option<String>,
    pub user_id: UserId,
    pub role: Role,
}

impl ProcessActionRequest {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id.clone(), self.role.clone())
    }
}

/// Body of `POST /documents/:document_id/return`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnToPreviousRequest {
    #[serde(default)]
    pub comments: Option<String>,
    pub user_id: UserId,
    pub role: Role,
}

impl ReturnToPreviousRequest {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id.clone(), self.role.clone())
    }
}

/// Body of `PUT /documents/:document_id/checklist/:status_item_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItemRequest {
    pub is_complete: bool,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub circuits: usize,
}

/// Compact circuit listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitSummary {
    pub id: CircuitId,
    pub title: String,
    pub is_active: bool,
    pub has_ordered_flow: bool,
    pub step_count: usize,
}

impl From<&Circuit> for CircuitSummary {
    fn from(circuit: &Circuit) -> Self {
        CircuitSummary {
            id: circuit.id.clone(),
            title: circuit.title.clone(),
            is_active: circuit.is_active,
            has_ordered_flow: circuit.has_ordered_flow,
            step_count: circuit.steps.len(),
        }
    }
}

/// Error body: `{"error": {"code", "category", "message", "details"}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable machine-readable code, e.g. `step_incomplete`
    pub code: String,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

/// A [`WorkflowError`] on its way out of a handler
#[derive(Debug)]
pub struct ApiError(pub WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(error: WorkflowError) -> Self {
        ApiError(error)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            WorkflowError::CircuitNotFound { .. } | WorkflowError::NotAssigned { .. } => {
                StatusCode::NOT_FOUND
            }
            WorkflowError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            WorkflowError::AlreadyAssigned { .. }
            | WorkflowError::TerminalState { .. }
            | WorkflowError::CircuitInactive { .. }
            | WorkflowError::ConcurrentModification { .. } => StatusCode::CONFLICT,
            WorkflowError::UnknownAction { .. }
            | WorkflowError::StepIncomplete { .. }
            | WorkflowError::NoPreviousStep { .. }
            | WorkflowError::UnknownStatusItem { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::Serialization(_) => StatusCode::BAD_REQUEST,
            WorkflowError::MalformedCircuit { .. }
            | WorkflowError::Configuration(_)
            | WorkflowError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Guard-specific context a UI needs to render an actionable message
    fn details(&self) -> serde_json::Value {
        match &self.0 {
            WorkflowError::StepIncomplete { step_id, outstanding } => json!({
                "step_id": step_id,
                "outstanding": outstanding,
            }),
            WorkflowError::Unauthorized {
                step_id,
                required_role,
                actual_role,
            } => json!({
                "step_id": step_id,
                "required_role": required_role,
                "actual_role": actual_role,
            }),
            WorkflowError::TerminalState { status, .. } => json!({ "status": status }),
            WorkflowError::AlreadyAssigned {
                circuit_id, status, ..
            } => json!({
                "circuit_id": circuit_id,
                "status": status,
            }),
            WorkflowError::UnknownAction { action_id, step_id } => json!({
                "action_id": action_id,
                "step_id": step_id,
            }),
            WorkflowError::UnknownStatusItem {
                status_item_id,
                step_id,
            } => json!({
                "status_item_id": status_item_id,
                "step_id": step_id,
            }),
            WorkflowError::ConcurrentModification { attempts, .. } => {
                json!({ "attempts": attempts })
            }
            _ => serde_json::Value::Null,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.0.code().to_string(),
                category: self.0.category(),
                message: self.0.to_string(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutstandingItem, StepId};

    #[test]
    fn test_status_codes_follow_categories() {
        let unauthorized = ApiError(WorkflowError::Unauthorized {
            step_id: StepId::from("s1"),
            required_role: None,
            actual_role: Role::member("x"),
        });
        assert_eq!(unauthorized.status_code(), StatusCode::FORBIDDEN);

        let persistence = ApiError(anyhow::anyhow!("down").into());
        assert_eq!(persistence.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_step_incomplete_details_list_items() {
        let err = ApiError(WorkflowError::StepIncomplete {
            step_id: StepId::from("s1"),
            outstanding: vec![OutstandingItem {
                id: "nda".into(),
                title: "NDA attached".into(),
            }],
        });
        let details = err.details();
        assert_eq!(details["outstanding"][0]["id"], "nda");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_action_request_parses_tagged_role() {
        let request: ProcessActionRequest = serde_json::from_value(json!({
            "action_id": "sign",
            "is_approved": true,
            "user_id": "u1",
            "role": {"kind": "member", "role_id": "legal"}
        }))
        .unwrap();
        assert_eq!(request.actor().role, Role::member("legal"));
        assert!(request.comments.is_none());
    }
}
