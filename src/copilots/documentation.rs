use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CopilotKind, context_prompt, default_language, fenced, read_source};
use crate::agents::{AgentResponse, Copilot, CopilotAgent, TaskContext};
use crate::tools::{CommitInfo, FileReader};

pub(crate) const INSTRUCTIONS: &str = "\
You are a technical writer specialized in software documentation.

## Responsibilities

1. **Docstrings**: write clear, informative docstrings in the requested style
   (Google, NumPy, Sphinx) covering parameters, returns, errors and examples.
2. **README files**: write complete, well structured READMEs with badges,
   installation, usage and examples adapted to the project.
3. **API documentation**: document endpoints and public functions with
   request and response examples and precise types.
4. **Code comments**: explain complex logic where needed and keep the code
   self-documenting.

## Principles

- Clarity: documentation must be easy to understand
- Completeness: cover every important aspect
- Examples: include practical examples whenever possible

## Format

Use Markdown. Be precise with types and descriptions.
";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocstringStyle {
    #[default]
    Google,
    Numpy,
    Sphinx,
}

impl DocstringStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Numpy => "numpy",
            Self::Sphinx => "sphinx",
        }
    }
}

impl fmt::Display for DocstringStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocstringStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "numpy" => Ok(Self::Numpy),
            "sphinx" => Ok(Self::Sphinx),
            _ => anyhow::bail!("unknown docstring style: {} (expected google, numpy or sphinx)", s),
        }
    }
}

/// Kind of documentation requested through the REST surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    #[default]
    Docstring,
    Readme,
    Api,
    #[serde(alias = "inline")]
    InlineComments,
    Changelog,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiDocFormat {
    #[default]
    Markdown,
    OpenApi,
    AsyncApi,
}

impl ApiDocFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::OpenApi => "openapi",
            Self::AsyncApi => "asyncapi",
        }
    }
}

/// Project facts used to write a README
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub file_structure: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum DocumentationTask {
    GenerateDocstring {
        code: String,
        #[serde(default = "default_language")]
        language: String,
        #[serde(default)]
        style: Option<DocstringStyle>,
    },
    GenerateReadme {
        project: ProjectInfo,
    },
    GenerateApiDocs {
        code: String,
        #[serde(default = "default_language")]
        language: String,
        #[serde(default)]
        format: ApiDocFormat,
    },
    AddInlineComments {
        code: String,
        #[serde(default = "default_language")]
        language: String,
    },
    GenerateChangelog {
        commits: Vec<CommitInfo>,
        #[serde(default = "default_version")]
        version: String,
    },
    DocumentFile {
        path: PathBuf,
        #[serde(default)]
        style: Option<DocstringStyle>,
    },
}

fn default_version() -> String {
    "0.0.0".to_string()
}

/// Writes docstrings, READMEs, API docs and changelogs
#[derive(Debug)]
pub struct DocumentationCopilot {
    agent: CopilotAgent,
    files: FileReader,
    default_style: DocstringStyle,
}

impl DocumentationCopilot {
    pub fn new(agent: CopilotAgent, files: FileReader) -> Self {
        Self {
            agent,
            files,
            default_style: DocstringStyle::default(),
        }
    }

    pub fn with_default_style(mut self, style: DocstringStyle) -> Self {
        self.default_style = style;
        self
    }

    pub async fn generate_docstring(
        &self,
        code: &str,
        language: &str,
        style: Option<DocstringStyle>,
    ) -> AgentResponse {
        let style = style.unwrap_or(self.default_style);
        let prompt = format!(
            "Write a complete docstring in **{style}** style for the following code:\n\n{}\n\n\
             The docstring must include:\n\
             - A clear description of the purpose\n\
             - Parameters with types and descriptions\n\
             - The return value with type and description\n\
             - Errors or exceptions that can be raised\n\
             - A usage example when it helps\n\n\
             Return ONLY the docstring, formatted correctly for {language}.",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn generate_readme(&self, project: &ProjectInfo) -> AgentResponse {
        let features = project
            .features
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Write a complete, professional README.md for the following project:\n\n\
             **Project name:** {}\n\
             **Description:** {}\n\
             **Main language:** {}\n\n\
             **Features:**\n{features}\n\n\
             **File structure:**\n{}\n\n\
             The README must include:\n\
             1. Title with badges (build, version, license)\n\
             2. Project description\n\
             3. Features\n\
             4. Prerequisites\n\
             5. Installation\n\
             6. Basic usage with examples\n\
             7. Configuration\n\
             8. Project structure\n\
             9. Contributing\n\
             10. License",
            project.name,
            project.description,
            project.language.as_deref().unwrap_or("Python"),
            fenced("", &project.file_structure)
        );
        self.agent.run(&prompt).await
    }

    pub async fn generate_api_docs(
        &self,
        code: &str,
        language: &str,
        format: ApiDocFormat,
    ) -> AgentResponse {
        let prompt = format!(
            "Write API documentation in **{}** format for the following code:\n\n{}\n\n\
             Include:\n\
             - A description of each endpoint or function\n\
             - Accepted parameters (types, required or optional)\n\
             - Request examples\n\
             - Response examples\n\
             - Possible error codes",
            format.as_str(),
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn add_inline_comments(&self, code: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Add explanatory comments to the following code.\n\n{}\n\n\
             Rules:\n\
             - Comment complex or non-obvious logic\n\
             - Do not comment the obvious\n\
             - Keep comments concise\n\
             - Use the comment style appropriate for {language}\n\n\
             Return the complete code with the comments added.",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    /// Keep a Changelog entry for `version` built from commit subjects
    pub async fn generate_changelog(&self, commits: &[CommitInfo], version: &str) -> AgentResponse {
        let commit_lines = commits
            .iter()
            .map(|c| format!("- {} ({})", c.message, c.date.format("%Y-%m-%d")))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Write a CHANGELOG entry for version {version} based on the following commits:\n\n\
             {commit_lines}\n\n\
             Use the Keep a Changelog format:\n\
             - Added: new features\n\
             - Changed: changes to existing functionality\n\
             - Deprecated: features that will be removed\n\
             - Removed: removed features\n\
             - Fixed: bug fixes\n\
             - Security: vulnerability fixes"
        );
        self.agent.run(&prompt).await
    }

    /// Add or improve documentation for every function and type in a file.
    pub async fn document_file(&self, path: &Path, style: Option<DocstringStyle>) -> AgentResponse {
        let source = match read_source(&self.files, path) {
            Ok(source) => source,
            Err(failure) => return failure,
        };
        let style = style.unwrap_or(self.default_style);
        let prompt = format!(
            "Analyze the following file and add or improve its documentation:\n\n\
             **File:** {}\n\
             **Language:** {}\n\
             **Docstring style:** {style}\n\n{}\n\n\
             For each function and class:\n\
             1. Add a complete docstring if none exists\n\
             2. Improve existing docstrings that are incomplete\n\
             3. Keep good docstrings as they are\n\n\
             Return the complete file with the documentation.",
            source.name,
            source.language,
            fenced(source.language, &source.code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn execute(&self, task: DocumentationTask) -> AgentResponse {
        match task {
            DocumentationTask::GenerateDocstring {
                code,
                language,
                style,
            } => self.generate_docstring(&code, &language, style).await,
            DocumentationTask::GenerateReadme { project } => self.generate_readme(&project).await,
            DocumentationTask::GenerateApiDocs {
                code,
                language,
                format,
            } => self.generate_api_docs(&code, &language, format).await,
            DocumentationTask::AddInlineComments { code, language } => {
                self.add_inline_comments(&code, &language).await
            }
            DocumentationTask::GenerateChangelog { commits, version } => {
                self.generate_changelog(&commits, &version).await
            }
            DocumentationTask::DocumentFile { path, style } => self.document_file(&path, style).await,
        }
    }
}

#[async_trait]
impl Copilot for DocumentationCopilot {
    fn kind(&self) -> CopilotKind {
        CopilotKind::Documentation
    }

    fn agent(&self) -> &CopilotAgent {
        &self.agent
    }

    async fn process(&self, context: &TaskContext) -> AgentResponse {
        let task = format!(
            "Generate documentation for the material above. Use {} style docstrings.",
            self.default_style
        );
        match context_prompt(&self.files, context, super::DEFAULT_LANGUAGE, &task) {
            Ok(prompt) => self.agent.run(&prompt).await,
            Err(failure) => failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::llm::mock::RecordingProvider;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn copilot(provider: Arc<RecordingProvider>) -> DocumentationCopilot {
        let agent = CopilotAgent::new(
            "Documentation Writer",
            "docs",
            INSTRUCTIONS,
            ModelConfig::default(),
            provider,
        );
        DocumentationCopilot::new(agent, FileReader::new("."))
    }

    #[tokio::test]
    async fn docstring_uses_default_style() {
        let provider = Arc::new(RecordingProvider::replying("\"\"\"Adds.\"\"\""));
        let docs = copilot(provider.clone()).with_default_style(DocstringStyle::Numpy);

        docs.generate_docstring("def add(a, b): ...", "python", None).await;
        assert!(provider.last_prompt().contains("**numpy** style"));

        docs.generate_docstring("def add(a, b): ...", "python", Some(DocstringStyle::Sphinx))
            .await;
        assert!(provider.last_prompt().contains("**sphinx** style"));
    }

    #[tokio::test]
    async fn readme_lists_features() {
        let provider = Arc::new(RecordingProvider::replying("# Demo"));
        let project = ProjectInfo {
            name: "demo".into(),
            description: "A demo".into(),
            language: Some("Rust".into()),
            features: vec!["fast".into(), "small".into()],
            file_structure: "src/\n  main.rs".into(),
        };

        copilot(provider.clone()).generate_readme(&project).await;

        let prompt = provider.last_prompt();
        assert!(prompt.contains("**Project name:** demo"));
        assert!(prompt.contains("**Main language:** Rust"));
        assert!(prompt.contains("- fast\n- small"));
    }

    #[tokio::test]
    async fn changelog_includes_commit_dates() {
        let provider = Arc::new(RecordingProvider::replying("## 1.2.0"));
        let commits = vec![CommitInfo {
            hash: "abc1234def".into(),
            short_hash: "abc1234".into(),
            message: "Add cache stats".into(),
            author: "Ada".into(),
            author_email: "ada@example.com".into(),
            date: Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap(),
        }];

        copilot(provider.clone()).generate_changelog(&commits, "1.2.0").await;

        let prompt = provider.last_prompt();
        assert!(prompt.contains("version 1.2.0"));
        assert!(prompt.contains("- Add cache stats (2024-03-09)"));
    }

    #[test]
    fn parses_styles_and_doc_types() {
        assert_eq!("NumPy".parse::<DocstringStyle>().unwrap(), DocstringStyle::Numpy);
        assert!("javadoc".parse::<DocstringStyle>().is_err());
        let doc_type: DocType = serde_json::from_str("\"inline\"").unwrap();
        assert_eq!(doc_type, DocType::InlineComments);
    }
}
