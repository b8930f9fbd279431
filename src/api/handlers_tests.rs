// HTTP-level tests for the REST API

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{create_router, ApiState};
use crate::engine::{InMemoryCircuitRepository, WorkflowEngine};
use crate::models::{Action, Circuit, StatusItem, Step};

fn contracts() -> Circuit {
    Circuit::new("contracts", "Contract approval", true)
        .with_step(Step::new("draft", "draft", 0))
        .with_step(Step::new("legal", "legal", 1).with_responsible_role("legal"))
        .with_step(Step::new("archive", "archive", 2).final_step())
        .with_action(Action::new("submit", "Submit", "draft"))
        .with_action(Action::new("sign", "Sign", "legal"))
        .with_action(Action::new("file", "File", "archive"))
        .with_status_item(StatusItem::required("nda", "legal", "NDA attached"))
        .with_status_item(StatusItem::optional("memo", "legal", "Memo"))
        .activated()
}

fn app() -> Router {
    let repository = InMemoryCircuitRepository::with_circuits(vec![contracts()]).unwrap();
    let engine = Arc::new(WorkflowEngine::in_memory(Arc::new(repository)));
    create_router(ApiState::new(engine), true)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn action(action_id: &str, approve: bool, role: Value) -> Value {
    json!({
        "action_id": action_id,
        "is_approved": approve,
        "user_id": "u1",
        "role": role,
    })
}

fn member(role_id: &str) -> Value {
    json!({"kind": "member", "role_id": role_id})
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["circuits"], 1);
}

#[tokio::test]
async fn test_circuit_listing_and_lookup() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/circuits", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], "contracts");
    assert_eq!(body[0]["step_count"], 3);

    let (status, body) = send(&app, Method::GET, "/circuits/contracts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["steps"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, Method::GET, "/circuits/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "circuit_not_found");
}

#[tokio::test]
async fn test_full_document_journey() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/documents/doc-1/assignment",
        Some(json!({"circuit_id": "contracts", "comments": "new contract"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["current_step_id"], "draft");
    assert_eq!(body["workflow_status"], "in_progress");

    let (status, body) = send(&app, Method::GET, "/documents/doc-1/eligible-actions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], "submit");

    let (status, body) = send(
        &app,
        Method::POST,
        "/documents/doc-1/actions",
        Some(action("submit", true, member("clerk"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_step_id"], "legal");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/documents/doc-1/checklist/nda",
        Some(json!({"is_complete": true, "comments": "attached v2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_complete"], true);

    let (status, _) = send(
        &app,
        Method::POST,
        "/documents/doc-1/actions",
        Some(action("sign", true, member("legal"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app,
        Method::POST,
        "/documents/doc-1/actions",
        Some(action("file", true, member("clerk"))),
    )
    .await;
    assert_eq!(body["workflow_status"], "completed");

    let (status, body) = send(&app, Method::GET, "/documents/doc-1/history", None).await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["approve", "approve", "approve"]);
}

#[tokio::test]
async fn test_guard_failures_are_structured() {
    let app = app();
    send(
        &app,
        Method::POST,
        "/documents/doc-1/assignment",
        Some(json!({"circuit_id": "contracts"})),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/documents/doc-1/actions",
        Some(action("submit", true, member("clerk"))),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/documents/doc-1/actions",
        Some(action("sign", true, member("finance"))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "unauthorized");
    assert_eq!(body["error"]["category"], "authorization");
    assert_eq!(body["error"]["details"]["required_role"], "legal");

    let (status, body) = send(
        &app,
        Method::POST,
        "/documents/doc-1/actions",
        Some(action("sign", true, member("legal"))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "step_incomplete");
    assert_eq!(
        body["error"]["message"],
        "1 required checklist items incomplete on step legal"
    );
    assert_eq!(body["error"]["details"]["outstanding"][0]["id"], "nda");

    let (status, body) = send(
        &app,
        Method::POST,
        "/documents/doc-1/actions",
        Some(action("sign", false, json!({"kind": "admin"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflow_status"], "rejected");

    let (status, body) = send(
        &app,
        Method::POST,
        "/documents/doc-1/return",
        Some(json!({"user_id": "u1", "role": {"kind": "admin"}})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "terminal_state");
    assert_eq!(body["error"]["details"]["status"], "rejected");
}

#[tokio::test]
async fn test_unassigned_document() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/documents/nobody/state", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_assigned");

    let (status, body) = send(&app, Method::GET, "/documents/nobody/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_double_assignment_conflicts() {
    let app = app();
    let assign = json!({"circuit_id": "contracts"});

    let (status, _) =
        send(&app, Method::POST, "/documents/d/assignment", Some(assign.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, "/documents/d/assignment", Some(assign)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "already_assigned");
}

#[tokio::test]
async fn test_checklist_view_and_unknown_item() {
    let app = app();
    send(
        &app,
        Method::POST,
        "/documents/d/assignment",
        Some(json!({"circuit_id": "contracts"})),
    )
    .await;

    // Draft step defines no items
    let (status, body) = send(&app, Method::GET, "/documents/d/checklist", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(
        &app,
        Method::PUT,
        "/documents/d/checklist/nda",
        Some(json!({"is_complete": true})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "unknown_status_item");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}
