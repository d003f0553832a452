mod common;

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use copilot_ia::api::CopilotResponse;
use copilot_ia::{AppState, CoordinatorResponse, CopilotKind, build_router};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::util::ServiceExt;

use common::{MockLlmProvider, factory};

fn app(provider: Arc<MockLlmProvider>, dir: &TempDir) -> axum::Router {
    build_router(AppState::new(factory(provider, dir.path()).suite()))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let response = app(Arc::new(MockLlmProvider::single_response("ok")), &dir)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_security_endpoint_returns_model_and_metadata() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(MockLlmProvider::single_response("A03: SQL injection on line 1"));

    let response = app(provider.clone(), &dir)
        .oneshot(post(
            "/api/v1/security",
            json!({ "code": "cursor.execute('SELECT ' + q)", "language": "python" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: CopilotResponse = read_json(response).await;
    assert!(body.success);
    assert_eq!(body.model.as_deref(), Some("gpt-4o"));
    assert_eq!(body.metadata["agent"], "Security Auditor");
    assert!(provider.prompts()[0].contains("cursor.execute"));
}

#[tokio::test]
async fn test_refactor_focus_reaches_prompt() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(MockLlmProvider::single_response("Extract method"));

    app(provider.clone(), &dir)
        .oneshot(post(
            "/api/v1/refactor",
            json!({ "code": "def f(): pass", "focus": ["readability", "performance"] }),
        ))
        .await
        .unwrap();

    assert!(provider.prompts()[0].contains("Focus especially on: readability, performance"));
}

#[tokio::test]
async fn test_unknown_test_type_is_rejected() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(MockLlmProvider::single_response("unused"));

    let response = app(provider.clone(), &dir)
        .oneshot(post(
            "/api/v1/test",
            json!({ "code": "def f(): pass", "test_type": "smoke" }),
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn test_coordinate_sequential_with_keywords() {
    let dir = TempDir::new().unwrap();
    let provider = Arc::new(MockLlmProvider::single_response("Looks good"));

    let response = app(provider, &dir)
        .oneshot(post(
            "/api/v1/coordinate",
            json!({ "message": "document and test this", "code": "def f(): pass" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: CoordinatorResponse = read_json(response).await;
    assert!(body.success);
    assert_eq!(
        body.copilots_used,
        vec![CopilotKind::Documentation, CopilotKind::Testing]
    );
    assert!(body.recommendations.is_empty());
}
