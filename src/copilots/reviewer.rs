use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use super::{CopilotKind, context_prompt, default_language, fenced, read_source};
use crate::agents::{AgentResponse, Copilot, CopilotAgent, TaskContext};
use crate::tools::FileReader;

pub(crate) const INSTRUCTIONS: &str = "\
You are an experienced, detail-oriented code reviewer.

Your goal is to analyze code and give constructive, actionable feedback.

## Areas of analysis

1. **Bugs and potential errors**: logic errors, null dereferences, race
   conditions, resource leaks, poor error handling.
2. **Security**: injection, exposure of sensitive data, weak authentication or
   authorization, missing input validation.
3. **Performance**: inefficient loops, N+1 queries, excessive allocation,
   needless blocking operations.
4. **Readability and maintainability**: clear naming, overly long functions,
   high cyclomatic complexity, missing documentation.
5. **Good practices**: SOLID, DRY, KISS and the idioms of the language.

## Response format

Answer in Markdown with:
- An executive summary
- The problems found, each with a severity (critical, high, medium, low, info)
- Suggested fixes
- A quality score from 0 to 10
- General recommendations
";

/// Operations accepted by [`CodeReviewerCopilot::execute`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum ReviewTask {
    AnalyzeCode {
        code: String,
        #[serde(default = "default_language")]
        language: String,
        #[serde(default)]
        filename: Option<String>,
    },
    AnalyzeFile {
        path: PathBuf,
    },
    AnalyzeDiff {
        diff: String,
        #[serde(default)]
        context: Option<String>,
    },
    QuickReview {
        code: String,
        #[serde(default = "default_language")]
        language: String,
    },
}

/// Reviews code, files and diffs
#[derive(Debug)]
pub struct CodeReviewerCopilot {
    agent: CopilotAgent,
    files: FileReader,
}

impl CodeReviewerCopilot {
    pub fn new(agent: CopilotAgent, files: FileReader) -> Self {
        Self { agent, files }
    }

    pub async fn analyze_code(
        &self,
        code: &str,
        language: &str,
        filename: Option<&str>,
    ) -> AgentResponse {
        let file_line = filename
            .map(|name| format!("File: {}\n", name))
            .unwrap_or_default();
        let prompt = format!(
            "Analyze the following {language} code:\n\n{file_line}{}\n\n\
             Give a detailed review following the guidelines.",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn analyze_file(&self, path: &Path) -> AgentResponse {
        match read_source(&self.files, path) {
            Ok(source) => {
                self.analyze_code(&source.code, source.language, Some(&source.name))
                    .await
            }
            Err(failure) => failure,
        }
    }

    /// Review a unified diff, optionally with a note on what the change is for.
    pub async fn analyze_diff(&self, diff: &str, context: Option<&str>) -> AgentResponse {
        let context_line = context
            .map(|c| format!("\n\nContext: {}", c))
            .unwrap_or_default();
        let prompt = format!(
            "Analyze the following code changes:\n\n{}{context_line}\n\n\
             Evaluate:\n\
             1. Do the changes introduce bugs?\n\
             2. Are there security problems?\n\
             3. Does the code follow good practices?\n\
             4. Suggestions for improvement",
            fenced("diff", diff)
        );
        self.agent.run(&prompt).await
    }

    /// Short review listing only the five most important problems
    pub async fn quick_review(&self, code: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Do a QUICK review of the code below.\n\
             List only the TOP 5 most important problems.\n\
             Be concise and direct.\n\n{}",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn quick_review_file(&self, path: &Path) -> AgentResponse {
        match read_source(&self.files, path) {
            Ok(source) => self.quick_review(&source.code, source.language).await,
            Err(failure) => failure,
        }
    }

    pub async fn execute(&self, task: ReviewTask) -> AgentResponse {
        match task {
            ReviewTask::AnalyzeCode {
                code,
                language,
                filename,
            } => self.analyze_code(&code, &language, filename.as_deref()).await,
            ReviewTask::AnalyzeFile { path } => self.analyze_file(&path).await,
            ReviewTask::AnalyzeDiff { diff, context } => {
                self.analyze_diff(&diff, context.as_deref()).await
            }
            ReviewTask::QuickReview { code, language } => self.quick_review(&code, &language).await,
        }
    }
}

#[async_trait]
impl Copilot for CodeReviewerCopilot {
    fn kind(&self) -> CopilotKind {
        CopilotKind::CodeReviewer
    }

    fn agent(&self) -> &CopilotAgent {
        &self.agent
    }

    async fn process(&self, context: &TaskContext) -> AgentResponse {
        match context_prompt(
            &self.files,
            context,
            super::DEFAULT_LANGUAGE,
            "Please perform a complete review of the code.",
        ) {
            Ok(prompt) => self.agent.run(&prompt).await,
            Err(failure) => failure,
        }
    }
}
