mod common;

use std::sync::Arc;

use copilot_ia::{CoordinatorRequest, CopilotKind, TaskIntent};
use tempfile::TempDir;

use common::{FailingLlmProvider, MockLlmProvider, factory};

#[tokio::test]
async fn test_portuguese_request_fans_out_to_matching_copilots() {
    let dir = TempDir::new().expect("create temp dir");
    let provider = Arc::new(MockLlmProvider::single_response("No critical issues."));
    let coordinator = factory(provider.clone(), dir.path()).suite().coordinator();

    let request = CoordinatorRequest::new(
        "Analise este código para bugs e vulnerabilidades de segurança",
    )
    .with_code("query = 'SELECT * FROM users WHERE id = ' + user_id");

    let response = coordinator.process(&request).await;

    assert!(response.success);
    assert_eq!(
        response.copilots_used,
        vec![
            CopilotKind::CodeReviewer,
            CopilotKind::Debug,
            CopilotKind::Security
        ]
    );
    assert_eq!(provider.prompts().len(), 3);
    assert!(
        provider
            .prompts()
            .iter()
            .all(|p| p.contains("SELECT * FROM users"))
    );
}

#[tokio::test]
async fn test_concurrent_mode_collects_every_result() {
    let dir = TempDir::new().expect("create temp dir");
    std::fs::write(dir.path().join("app.py"), "def main():\n    pass\n").expect("write source");
    let provider = Arc::new(MockLlmProvider::single_response("I suggest adding tests."));
    let coordinator = factory(provider, dir.path()).suite().coordinator();

    let request = CoordinatorRequest::new("full analysis").with_files(vec!["app.py".into()]);
    let response = coordinator.process_concurrent(&request).await;

    assert!(response.success);
    assert_eq!(response.details.len(), 3);
    for name in ["code_reviewer", "security", "architecture"] {
        assert!(response.details[name].success, "{} should succeed", name);
    }
    assert_eq!(response.recommendations.len(), 1);
}

#[tokio::test]
async fn test_unreadable_files_fail_each_copilot() {
    let dir = TempDir::new().expect("create temp dir");
    let provider = Arc::new(MockLlmProvider::single_response("unused"));
    let coordinator = factory(provider.clone(), dir.path()).suite().coordinator();

    let request = CoordinatorRequest::new("review").with_files(vec!["missing.py".into()]);
    let response = coordinator.process(&request).await;

    assert!(!response.success);
    assert_eq!(
        response.details["code_reviewer"].metadata["error"],
        "no_readable_files"
    );
    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn test_provider_failure_marks_response_failed() {
    let dir = TempDir::new().expect("create temp dir");
    let coordinator = factory(Arc::new(FailingLlmProvider), dir.path())
        .suite()
        .coordinator();

    let response = coordinator
        .process(&CoordinatorRequest::new("write tests").with_code("fn add() {}"))
        .await;

    assert!(!response.success);
    assert_eq!(response.copilots_used, vec![CopilotKind::Testing]);
    assert!(response.summary.contains("- ❌ testing: analysis failed"));
    assert!(
        response.details["testing"]
            .content
            .contains("service unavailable")
    );
}

#[test]
fn test_no_keyword_detects_review_only() {
    let dir = TempDir::new().expect("create temp dir");
    let coordinator = factory(Arc::new(FailingLlmProvider), dir.path())
        .suite()
        .coordinator();

    assert_eq!(
        coordinator.detect_intent("what is this?"),
        vec![TaskIntent::Review]
    );
    assert_eq!(
        coordinator.detect_intent("Pode revisar?"),
        vec![TaskIntent::Review]
    );
}
