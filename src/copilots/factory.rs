use std::sync::Arc;

use super::{
    ArchitectureCopilot, CodeReviewerCopilot, CopilotKind, DebugCopilot, DocumentationCopilot,
    RefactoringCopilot, SecurityCopilot, TestingCopilot,
};
use crate::agents::CopilotAgent;
use crate::cache::DiskCache;
use crate::config::ProjectConfig;
use crate::coordinator::CopilotCoordinator;
use crate::llm::LlmProvider;
use crate::tools::FileReader;

/// Builds copilots that share one provider, configuration and cache.
pub struct CopilotFactory {
    provider: Arc<dyn LlmProvider>,
    config: ProjectConfig,
    cache: Option<Arc<DiskCache>>,
    files: FileReader,
}

impl CopilotFactory {
    /// Factory reading files relative to the current directory
    pub fn new(provider: Arc<dyn LlmProvider>, config: ProjectConfig) -> Self {
        let files = FileReader::current_dir()
            .with_extra_extensions(&config.files.extra_extensions)
            .with_max_file_size(config.files.max_file_size());
        Self {
            provider,
            config,
            cache: None,
            files,
        }
    }

    pub fn with_cache(mut self, cache: Arc<DiskCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_file_reader(mut self, files: FileReader) -> Self {
        self.files = files;
        self
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn file_reader(&self) -> &FileReader {
        &self.files
    }

    /// Agent for `kind` with its instructions and effective model parameters
    pub fn agent(&self, kind: CopilotKind) -> CopilotAgent {
        let agent = CopilotAgent::new(
            kind.display_name(),
            kind.description(),
            kind.instructions(),
            self.config.model_for(kind),
            Arc::clone(&self.provider),
        );
        match &self.cache {
            Some(cache) => agent.with_cache(Arc::clone(cache)),
            None => agent,
        }
    }

    pub fn code_reviewer(&self) -> CodeReviewerCopilot {
        CodeReviewerCopilot::new(self.agent(CopilotKind::CodeReviewer), self.files.clone())
    }

    pub fn documentation(&self) -> DocumentationCopilot {
        DocumentationCopilot::new(self.agent(CopilotKind::Documentation), self.files.clone())
    }

    pub fn testing(&self) -> TestingCopilot {
        TestingCopilot::new(self.agent(CopilotKind::Testing), self.files.clone())
    }

    pub fn debug(&self) -> DebugCopilot {
        DebugCopilot::new(self.agent(CopilotKind::Debug), self.files.clone())
    }

    pub fn refactoring(&self) -> RefactoringCopilot {
        RefactoringCopilot::new(self.agent(CopilotKind::Refactoring), self.files.clone())
    }

    pub fn architecture(&self) -> ArchitectureCopilot {
        ArchitectureCopilot::new(self.agent(CopilotKind::Architecture), self.files.clone())
    }

    pub fn security(&self) -> SecurityCopilot {
        SecurityCopilot::new(self.agent(CopilotKind::Security), self.files.clone())
    }

    /// One instance of every copilot
    pub fn suite(&self) -> CopilotSuite {
        CopilotSuite {
            code_reviewer: Arc::new(self.code_reviewer()),
            documentation: Arc::new(self.documentation()),
            testing: Arc::new(self.testing()),
            debug: Arc::new(self.debug()),
            refactoring: Arc::new(self.refactoring()),
            architecture: Arc::new(self.architecture()),
            security: Arc::new(self.security()),
        }
    }
}

impl std::fmt::Debug for CopilotFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopilotFactory")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .field("cached", &self.cache.is_some())
            .field("files", &self.files)
            .finish()
    }
}

/// Typed handles to all seven copilots
#[derive(Debug, Clone)]
pub struct CopilotSuite {
    pub code_reviewer: Arc<CodeReviewerCopilot>,
    pub documentation: Arc<DocumentationCopilot>,
    pub testing: Arc<TestingCopilot>,
    pub debug: Arc<DebugCopilot>,
    pub refactoring: Arc<RefactoringCopilot>,
    pub architecture: Arc<ArchitectureCopilot>,
    pub security: Arc<SecurityCopilot>,
}

impl CopilotSuite {
    /// Coordinator with every copilot in the suite registered
    pub fn coordinator(&self) -> CopilotCoordinator {
        let mut coordinator = CopilotCoordinator::new();
        coordinator.register(self.code_reviewer.clone());
        coordinator.register(self.documentation.clone());
        coordinator.register(self.testing.clone());
        coordinator.register(self.debug.clone());
        coordinator.register(self.refactoring.clone());
        coordinator.register(self.architecture.clone());
        coordinator.register(self.security.clone());
        coordinator
    }
}
