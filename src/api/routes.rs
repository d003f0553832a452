use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::AppState;
use crate::agents::{AgentResponse, Copilot, TaskContext};
use crate::coordinator::{CoordinatorRequest, CoordinatorResponse};
use crate::copilots::{ApiDocFormat, DocType, DocstringStyle, TestType, default_language};

const SERVICE_NAME: &str = "Copilot-IA API";

/// Code plus the language it is written in
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodeRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewRequest {
    #[serde(flatten)]
    pub source: CodeRequest,
    #[serde(default)]
    pub quick: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocRequest {
    #[serde(flatten)]
    pub source: CodeRequest,
    #[serde(default)]
    pub style: DocstringStyle,
    #[serde(default)]
    pub doc_type: DocType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TestRequest {
    #[serde(flatten)]
    pub source: CodeRequest,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub test_type: TestType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DebugRequest {
    pub error_message: String,
    #[serde(default)]
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefactorRequest {
    #[serde(flatten)]
    pub source: CodeRequest,
    #[serde(default)]
    pub focus: Option<Vec<String>>,
}

/// Coordinator request with a choice of fan-out mode
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoordinateRequest {
    #[serde(flatten)]
    pub request: CoordinatorRequest,
    #[serde(default)]
    pub parallel: bool,
}

/// Body returned by every copilot endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopilotResponse {
    pub success: bool,
    pub content: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl From<AgentResponse> for CopilotResponse {
    fn from(response: AgentResponse) -> Self {
        Self {
            success: response.success,
            content: response.content,
            model: response.model,
            metadata: response.metadata,
        }
    }
}

pub(super) async fn root() -> Json<Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

pub(super) async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub(super) async fn list_copilots(State(state): State<Arc<AppState>>) -> Json<Value> {
    let copilots: Vec<Value> = state
        .coordinator
        .available_copilots()
        .into_iter()
        .map(|kind| {
            json!({
                "id": kind.as_str(),
                "name": kind.display_name(),
                "description": kind.description(),
            })
        })
        .collect();
    Json(json!({ "copilots": copilots }))
}

pub(super) async fn review(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReviewRequest>,
) -> Json<CopilotResponse> {
    let ReviewRequest { source, quick } = request;
    info!(language = %source.language, quick, "review requested");

    let reviewer = &state.suite.code_reviewer;
    let response = if quick {
        reviewer.quick_review(&source.code, &source.language).await
    } else {
        reviewer
            .analyze_code(&source.code, &source.language, source.filename.as_deref())
            .await
    };
    Json(response.into())
}

pub(super) async fn docs(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DocRequest>,
) -> Json<CopilotResponse> {
    let DocRequest {
        source,
        style,
        doc_type,
    } = request;
    info!(language = %source.language, ?doc_type, "documentation requested");

    let docs = &state.suite.documentation;
    let response = match doc_type {
        DocType::Docstring => {
            docs.generate_docstring(&source.code, &source.language, Some(style))
                .await
        }
        DocType::Api => {
            docs.generate_api_docs(&source.code, &source.language, ApiDocFormat::Markdown)
                .await
        }
        DocType::InlineComments => docs.add_inline_comments(&source.code, &source.language).await,
        DocType::Readme | DocType::Changelog => {
            let message = match doc_type {
                DocType::Readme => "Write a README.md for the project this code belongs to.",
                _ => "Write a changelog entry describing this code.",
            };
            let context = TaskContext::new(message)
                .with_code(source.code)
                .with_language(source.language);
            docs.process(&context).await
        }
    };
    Json(response.into())
}

pub(super) async fn test(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TestRequest>,
) -> Json<CopilotResponse> {
    let TestRequest {
        source,
        framework,
        test_type,
    } = request;
    info!(language = %source.language, %test_type, "tests requested");

    let response = state
        .suite
        .testing
        .generate_tests(&source.code, &source.language, test_type, framework.as_deref())
        .await;
    Json(response.into())
}

pub(super) async fn security(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CodeRequest>,
) -> Json<CopilotResponse> {
    info!(language = %request.language, "security scan requested");
    debug!(filename = ?request.filename, "security scan source");

    let response = state
        .suite
        .security
        .vulnerability_scan(&request.code, &request.language)
        .await;
    Json(response.into())
}

pub(super) async fn debug_error(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DebugRequest>,
) -> Json<CopilotResponse> {
    info!(language = %request.language, "debug requested");

    let response = state
        .suite
        .debug
        .analyze_error(
            &request.error_message,
            request.stack_trace.as_deref(),
            request.code.as_deref(),
            &request.language,
        )
        .await;
    Json(response.into())
}

pub(super) async fn refactor(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefactorRequest>,
) -> Json<CopilotResponse> {
    let RefactorRequest { source, focus } = request;
    info!(language = %source.language, "refactoring requested");

    let response = state
        .suite
        .refactoring
        .suggest_refactoring(&source.code, &source.language, &focus.unwrap_or_default())
        .await;
    Json(response.into())
}

pub(super) async fn coordinate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CoordinateRequest>,
) -> Json<CoordinatorResponse> {
    let response = if body.parallel {
        state.coordinator.process_concurrent(&body.request).await
    } else {
        state.coordinator.process(&body.request).await
    };
    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::build_router;
    use crate::config::ProjectConfig;
    use crate::copilots::{CopilotFactory, CopilotKind};
    use crate::llm::mock::RecordingProvider;
    use crate::tools::FileReader;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::util::ServiceExt;

    fn state(provider: Arc<RecordingProvider>) -> AppState {
        let suite = CopilotFactory::new(provider, ProjectConfig::default()).suite();
        AppState::new(suite)
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn root_reports_running() {
        let Json(body) = root().await;
        assert_eq!(body["name"], SERVICE_NAME);
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn lists_registered_copilots() {
        let app = build_router(state(Arc::new(RecordingProvider::replying("ok"))));
        let request = Request::builder()
            .uri("/api/v1/copilots")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let copilots = body["copilots"].as_array().unwrap();
        assert_eq!(copilots.len(), CopilotKind::all().len());
        assert_eq!(copilots[0]["id"], "code_reviewer");
    }

    #[tokio::test]
    async fn review_returns_copilot_response() {
        let provider = Arc::new(RecordingProvider::replying("Score: 9/10"));
        let app = build_router(state(provider.clone()));

        let response = app
            .oneshot(post(
                "/api/v1/review",
                json!({ "code": "def f(): pass", "filename": "f.py" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: CopilotResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert!(body.success);
        assert_eq!(body.content, "Score: 9/10");
        assert_eq!(body.model.as_deref(), Some("gpt-4o"));
        assert!(provider.last_prompt().contains("```python\ndef f(): pass\n```"));
        assert!(provider.last_prompt().contains("File: f.py"));
    }

    #[tokio::test]
    async fn quick_review_uses_short_prompt() {
        let provider = Arc::new(RecordingProvider::replying("ok"));
        let app = build_router(state(provider.clone()));

        app.oneshot(post(
            "/api/v1/review",
            json!({ "code": "x = 1", "quick": true }),
        ))
        .await
        .unwrap();

        assert!(provider.last_prompt().contains("TOP 5"));
    }

    #[tokio::test]
    async fn docs_honors_style() {
        let provider = Arc::new(RecordingProvider::replying("\"\"\"Doc.\"\"\""));
        let app = build_router(state(provider.clone()));

        let response = app
            .oneshot(post(
                "/api/v1/docs",
                json!({ "code": "def f(): pass", "style": "numpy" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(provider.last_prompt().contains("**numpy** style"));
    }

    #[tokio::test]
    async fn unknown_docstring_style_is_rejected() {
        let provider = Arc::new(RecordingProvider::replying("ok"));
        let app = build_router(state(provider.clone()));

        let response = app
            .oneshot(post(
                "/api/v1/docs",
                json!({ "code": "def f(): pass", "style": "klingon" }),
            ))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_endpoint_defaults_to_pytest() {
        let provider = Arc::new(RecordingProvider::replying("def test_f(): ..."));
        let app = build_router(state(provider.clone()));

        app.oneshot(post("/api/v1/test", json!({ "code": "def f(): pass" })))
            .await
            .unwrap();

        assert!(provider.last_prompt().contains("pytest"));
    }

    #[tokio::test]
    async fn debug_includes_stack_trace() {
        let provider = Arc::new(RecordingProvider::replying("Root cause: ..."));
        let app = build_router(state(provider.clone()));

        let response = app
            .oneshot(post(
                "/api/v1/debug",
                json!({
                    "error_message": "KeyError: 'id'",
                    "stack_trace": "File \"app.py\", line 3",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let prompt = provider.last_prompt();
        assert!(prompt.contains("KeyError: 'id'"));
        assert!(prompt.contains("**Stack trace:**"));
    }

    #[tokio::test]
    async fn missing_required_field_is_rejected() {
        let provider = Arc::new(RecordingProvider::replying("ok"));
        let app = build_router(state(provider.clone()));

        let response = app
            .oneshot(post("/api/v1/security", json!({ "language": "python" })))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_reported_in_body() {
        let provider = Arc::new(RecordingProvider::failing("quota exceeded"));
        let app = build_router(state(provider));

        let response = app
            .oneshot(post("/api/v1/refactor", json!({ "code": "x = 1" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: CopilotResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert!(!body.success);
        assert!(body.content.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn coordinate_uses_preferred_copilots() {
        let provider = Arc::new(RecordingProvider::replying("I recommend smaller functions"));
        let app = build_router(state(provider.clone()));

        let response = app
            .oneshot(post(
                "/api/v1/coordinate",
                json!({
                    "message": "look at this",
                    "code": "def f(): pass",
                    "preferred_copilots": ["security", "testing"],
                    "parallel": true,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: CoordinatorResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert!(body.success);
        assert_eq!(
            body.copilots_used,
            vec![CopilotKind::Testing, CopilotKind::Security]
        );
        assert_eq!(body.details.len(), 2);
        assert_eq!(body.recommendations.len(), 1);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn coordinate_refuses_files_outside_workspace() {
        let workspace = tempfile::TempDir::new().unwrap();
        let outside = tempfile::TempDir::new().unwrap();
        std::fs::write(outside.path().join("secrets.env"), "API_KEY=hunter2").unwrap();

        let provider = Arc::new(RecordingProvider::replying("ok"));
        let suite = CopilotFactory::new(provider.clone(), ProjectConfig::default())
            .with_file_reader(FileReader::new(workspace.path()))
            .suite();
        let app = build_router(AppState::new(suite));

        let absolute = outside.path().join("secrets.env");
        let response = app
            .oneshot(post(
                "/api/v1/coordinate",
                json!({
                    "message": "review this file",
                    "files": [absolute, "../secrets.env"],
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: CoordinatorResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert!(!body.success);
        assert_eq!(body.details["code_reviewer"].metadata["error"], "no_readable_files");
        assert_eq!(provider.calls(), 0);
    }
}
