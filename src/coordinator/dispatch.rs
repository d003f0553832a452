use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::intent::{TaskIntent, detect_intent};
use crate::agents::{AgentResponse, Copilot, TaskContext};
use crate::copilots::CopilotKind;

/// Number of message characters included in logs
const MESSAGE_PREVIEW_CHARS: usize = 100;

const RECOMMENDATION_MARKERS: [&str; 4] = ["recommend", "suggest", "recomend", "sugest"];
const RECOMMENDATION_POINTER: &str = "See the detailed recommendations in each copilot's report";

/// A free-form request for the coordinator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorRequest {
    pub message: String,
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Skip intent detection and use these copilots. An empty list counts as absent.
    #[serde(default)]
    pub preferred_copilots: Option<Vec<CopilotKind>>,
}

impl CoordinatorRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_preferred(mut self, copilots: Vec<CopilotKind>) -> Self {
        self.preferred_copilots = Some(copilots);
        self
    }

    fn context(&self) -> TaskContext {
        TaskContext {
            message: self.message.clone(),
            files: self.files.clone(),
            code: self.code.clone(),
            language: self.language.clone(),
        }
    }
}

/// One copilot's share of a coordinated answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopilotResult {
    pub success: bool,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl From<AgentResponse> for CopilotResult {
    fn from(response: AgentResponse) -> Self {
        Self {
            success: response.success,
            content: response.content,
            metadata: response.metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorResponse {
    pub success: bool,
    pub summary: String,
    /// Results keyed by copilot id
    pub details: BTreeMap<String, CopilotResult>,
    pub recommendations: Vec<String>,
    pub copilots_used: Vec<CopilotKind>,
}

impl CoordinatorResponse {
    fn nothing_selected() -> Self {
        Self {
            success: false,
            summary: "No copilot available for this request".to_string(),
            details: BTreeMap::new(),
            recommendations: Vec::new(),
            copilots_used: Vec::new(),
        }
    }
}

/// Routes requests to registered copilots and merges their answers.
#[derive(Default)]
pub struct CopilotCoordinator {
    copilots: BTreeMap<CopilotKind, Arc<dyn Copilot>>,
}

impl CopilotCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under `copilot.kind()`, replacing any earlier registration.
    pub fn register(&mut self, copilot: Arc<dyn Copilot>) {
        let kind = copilot.kind();
        info!(copilot = %kind, agent = %copilot.agent().name(), "copilot registered");
        if self.copilots.insert(kind, copilot).is_some() {
            warn!(copilot = %kind, "replaced existing copilot");
        }
    }

    /// Registered kinds in declaration order
    pub fn available_copilots(&self) -> Vec<CopilotKind> {
        self.copilots.keys().copied().collect()
    }

    pub fn detect_intent(&self, message: &str) -> Vec<TaskIntent> {
        detect_intent(message)
    }

    /// Registered copilots serving any of `intents`, deduplicated and ordered
    pub fn select_copilots(&self, intents: &[TaskIntent]) -> Vec<CopilotKind> {
        let kinds = intents.iter().flat_map(|intent| intent.copilots().iter().copied());
        self.registered(kinds)
    }

    fn registered(&self, kinds: impl IntoIterator<Item = CopilotKind>) -> Vec<CopilotKind> {
        kinds
            .into_iter()
            .filter(|kind| self.copilots.contains_key(kind))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn plan(&self, request: &CoordinatorRequest) -> Vec<CopilotKind> {
        match &request.preferred_copilots {
            Some(preferred) if !preferred.is_empty() => {
                self.registered(preferred.iter().copied())
            }
            _ => self.select_copilots(&detect_intent(&request.message)),
        }
    }

    /// Run the selected copilots one after another.
    pub async fn process(&self, request: &CoordinatorRequest) -> CoordinatorResponse {
        info!(
            message = %request.message.chars().take(MESSAGE_PREVIEW_CHARS).collect::<String>(),
            "processing request"
        );
        let selected = self.plan(request);
        if selected.is_empty() {
            return CoordinatorResponse::nothing_selected();
        }

        let context = request.context();
        let mut results = Vec::with_capacity(selected.len());
        for kind in &selected {
            if let Some(copilot) = self.copilots.get(kind) {
                results.push((*kind, copilot.process(&context).await));
            }
        }
        consolidate(results, selected)
    }

    /// Run the selected copilots concurrently and gather their results.
    pub async fn process_concurrent(&self, request: &CoordinatorRequest) -> CoordinatorResponse {
        info!(
            message = %request.message.chars().take(MESSAGE_PREVIEW_CHARS).collect::<String>(),
            "processing request concurrently"
        );
        let selected = self.plan(request);
        if selected.is_empty() {
            return CoordinatorResponse::nothing_selected();
        }

        let context = request.context();
        let runs = selected.iter().filter_map(|kind| {
            let copilot = self.copilots.get(kind)?;
            let context = &context;
            Some(async move { (*kind, copilot.process(context).await) })
        });
        let results = join_all(runs).await;
        consolidate(results, selected)
    }
}

impl std::fmt::Debug for CopilotCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopilotCoordinator")
            .field("copilots", &self.available_copilots())
            .finish()
    }
}

fn consolidate(
    results: Vec<(CopilotKind, AgentResponse)>,
    copilots_used: Vec<CopilotKind>,
) -> CoordinatorResponse {
    let details: BTreeMap<String, CopilotResult> = results
        .into_iter()
        .map(|(kind, response)| (kind.to_string(), CopilotResult::from(response)))
        .collect();

    let success = details.values().all(|r| r.success);

    let lines: Vec<String> = details
        .iter()
        .map(|(name, result)| {
            if result.success {
                format!("- ✅ {}: analysis complete", name)
            } else {
                format!("- ❌ {}: analysis failed", name)
            }
        })
        .collect();
    let summary = format!("## Analysis summary\n\n{}", lines.join("\n"));

    let mentions_recommendations = details.values().any(|r| {
        let content = r.content.to_lowercase();
        RECOMMENDATION_MARKERS.iter().any(|m| content.contains(m))
    });
    let recommendations = if mentions_recommendations {
        vec![RECOMMENDATION_POINTER.to_string()]
    } else {
        Vec::new()
    };

    info!(
        success,
        copilots = details.len(),
        "coordinated request finished"
    );
    CoordinatorResponse {
        success,
        summary,
        details,
        recommendations,
        copilots_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::CopilotAgent;
    use crate::config::ModelConfig;
    use crate::llm::mock::RecordingProvider;
    use async_trait::async_trait;

    /// Copilot that answers with a fixed response
    struct StubCopilot {
        kind: CopilotKind,
        agent: CopilotAgent,
        reply: AgentResponse,
    }

    impl StubCopilot {
        fn new(kind: CopilotKind, reply: AgentResponse) -> Arc<Self> {
            let agent = CopilotAgent::new(
                kind.display_name(),
                kind.description(),
                "stub",
                ModelConfig::default(),
                Arc::new(RecordingProvider::replying("unused")),
            );
            Arc::new(Self { kind, agent, reply })
        }
    }

    #[async_trait]
    impl Copilot for StubCopilot {
        fn kind(&self) -> CopilotKind {
            self.kind
        }

        fn agent(&self) -> &CopilotAgent {
            &self.agent
        }

        async fn process(&self, _context: &TaskContext) -> AgentResponse {
            self.reply.clone()
        }
    }

    fn coordinator(kinds: &[CopilotKind]) -> CopilotCoordinator {
        let mut coordinator = CopilotCoordinator::new();
        for kind in kinds {
            coordinator.register(StubCopilot::new(*kind, AgentResponse::ok("Looks fine.")));
        }
        coordinator
    }

    #[test]
    fn selection_excludes_unregistered() {
        let coordinator = coordinator(&[CopilotKind::CodeReviewer, CopilotKind::Security]);
        let selected = coordinator.select_copilots(&[
            TaskIntent::Review,
            TaskIntent::Debug,
            TaskIntent::Security,
        ]);
        assert_eq!(selected, vec![CopilotKind::CodeReviewer, CopilotKind::Security]);
    }

    #[test]
    fn full_analysis_is_deduplicated() {
        let coordinator = coordinator(&CopilotKind::all());
        let selected =
            coordinator.select_copilots(&[TaskIntent::Security, TaskIntent::FullAnalysis]);
        assert_eq!(
            selected,
            vec![
                CopilotKind::CodeReviewer,
                CopilotKind::Architecture,
                CopilotKind::Security
            ]
        );
    }

    #[test]
    fn registering_again_replaces() {
        let mut coordinator = coordinator(&[CopilotKind::Debug]);
        coordinator.register(StubCopilot::new(CopilotKind::Debug, AgentResponse::ok("v2")));
        assert_eq!(coordinator.available_copilots(), vec![CopilotKind::Debug]);
    }

    #[tokio::test]
    async fn nothing_selected_is_a_failure() {
        let coordinator = coordinator(&[CopilotKind::Documentation]);
        let response = coordinator
            .process(&CoordinatorRequest::new("please review this"))
            .await;

        assert!(!response.success);
        assert!(response.copilots_used.is_empty());
        assert!(response.details.is_empty());
    }

    #[tokio::test]
    async fn portuguese_request_runs_registered_subset() {
        let coordinator = coordinator(&[CopilotKind::CodeReviewer, CopilotKind::Security]);
        let request = CoordinatorRequest::new(
            "Analise este código para bugs e vulnerabilidades de segurança",
        )
        .with_code("eval(input())");

        let response = coordinator.process(&request).await;

        assert!(response.success);
        assert_eq!(
            response.copilots_used,
            vec![CopilotKind::CodeReviewer, CopilotKind::Security]
        );
        assert_eq!(
            response.details.keys().cloned().collect::<Vec<_>>(),
            vec!["code_reviewer", "security"]
        );
        assert!(response.summary.contains("- ✅ code_reviewer: analysis complete"));
        assert!(response.recommendations.is_empty());
    }

    #[tokio::test]
    async fn preferred_copilots_bypass_detection() {
        let coordinator = coordinator(&[CopilotKind::Testing, CopilotKind::Debug]);
        let request = CoordinatorRequest::new("review please")
            .with_preferred(vec![CopilotKind::Testing, CopilotKind::Architecture]);

        let response = coordinator.process_concurrent(&request).await;

        assert_eq!(response.copilots_used, vec![CopilotKind::Testing]);
        assert!(response.details.contains_key("testing"));
    }

    #[tokio::test]
    async fn empty_preferred_list_falls_back_to_detection() {
        let coordinator = coordinator(&[CopilotKind::CodeReviewer, CopilotKind::Security]);
        let request = CoordinatorRequest::new("check for sql injection").with_preferred(vec![]);

        let response = coordinator.process(&request).await;

        assert!(response.success);
        assert_eq!(response.copilots_used, vec![CopilotKind::Security]);
    }

    #[tokio::test]
    async fn any_failure_fails_the_whole_response() {
        let mut coordinator = coordinator(&[CopilotKind::CodeReviewer]);
        coordinator.register(StubCopilot::new(
            CopilotKind::Security,
            AgentResponse::failure("Error while processing: timeout"),
        ));
        let request = CoordinatorRequest::new("security review");

        let response = coordinator.process_concurrent(&request).await;

        assert!(!response.success);
        assert!(response.summary.contains("- ❌ security: analysis failed"));
        assert!(!response.details["security"].success);
    }

    #[tokio::test]
    async fn recommendation_pointer_when_content_suggests() {
        let mut coordinator = CopilotCoordinator::new();
        coordinator.register(StubCopilot::new(
            CopilotKind::CodeReviewer,
            AgentResponse::ok("I RECOMMEND splitting this function."),
        ));

        let response = coordinator.process(&CoordinatorRequest::new("review")).await;

        assert_eq!(response.recommendations, vec![RECOMMENDATION_POINTER]);
    }
}
