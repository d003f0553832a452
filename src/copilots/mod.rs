//! The seven specialized copilots.
//!
//! Each copilot wraps a [`CopilotAgent`](crate::agents::CopilotAgent) with a
//! fixed instruction template and offers typed operations that build a prompt
//! and run it. Every copilot also implements [`Copilot`](crate::agents::Copilot)
//! so the coordinator can dispatch free-form requests to it.

mod architecture;
mod debug;
mod documentation;
mod factory;
mod kind;
mod refactoring;
mod reviewer;
mod security;
mod testing;

use std::path::Path;

pub use architecture::{ApiStyle, ArchitectureCopilot, ArchitectureTask};
pub use debug::{DebugCopilot, DebugTask};
pub use documentation::{ApiDocFormat, DocType, DocstringStyle, DocumentationCopilot, DocumentationTask, ProjectInfo};
pub use factory::{CopilotFactory, CopilotSuite};
pub use kind::CopilotKind;
pub use refactoring::{RefactoringCopilot, RefactoringKind, RefactoringTask};
pub use reviewer::{CodeReviewerCopilot, ReviewTask};
pub use security::{SecurityCopilot, SecurityTask};
pub use testing::{TestType, TestingCopilot, TestingTask, default_framework};

use crate::agents::{AgentResponse, TaskContext};
use crate::error::CopilotError;
use crate::tools::{FileReader, detect_language};

pub(crate) const DEFAULT_LANGUAGE: &str = "python";

pub(crate) fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// Markdown code fence
pub(crate) fn fenced(language: &str, code: &str) -> String {
    format!("```{}\n{}\n```", language, code)
}

/// Failure response for a file that could not be read
pub(crate) fn file_failure(e: &CopilotError) -> AgentResponse {
    AgentResponse::failure(e.to_string()).with_metadata("error", e.code())
}

/// A source file loaded for a copilot operation
pub(crate) struct SourceFile {
    pub name: String,
    pub stem: String,
    pub language: &'static str,
    pub code: String,
}

pub(crate) fn read_source(files: &FileReader, path: &Path) -> Result<SourceFile, AgentResponse> {
    let code = files.read_file(path, None).map_err(|e| file_failure(&e))?;
    Ok(SourceFile {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        stem: path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        language: detect_language(path),
        code,
    })
}

/// Build the prompt for a coordinator request.
///
/// Inline code and readable files are embedded as fenced blocks; unreadable
/// files become notes. Fails when files were requested but none could be read,
/// or when the request carries nothing at all.
pub(crate) fn context_prompt(
    files: &FileReader,
    ctx: &TaskContext,
    default_language: &str,
    task: &str,
) -> Result<String, AgentResponse> {
    let mut sections = Vec::new();
    let mut notes = Vec::new();
    let mut detected = None;

    if let Some(code) = ctx.code.as_deref().filter(|c| !c.trim().is_empty()) {
        sections.push(fenced(ctx.language_or(default_language), code));
    }

    for path in &ctx.files {
        match read_source(files, path) {
            Ok(source) => {
                if source.language != "text" {
                    detected.get_or_insert(source.language);
                }
                let language = ctx.language.as_deref().unwrap_or(source.language);
                sections.push(format!(
                    "File: {}\n{}",
                    path.display(),
                    fenced(language, &source.code)
                ));
            }
            Err(failure) => notes.push(format!("Could not read {}: {}", path.display(), failure.content)),
        }
    }

    if !ctx.files.is_empty() && sections.is_empty() {
        return Err(AgentResponse::failure(format!(
            "None of the requested files could be read:\n{}",
            notes.join("\n")
        ))
        .with_metadata("error", "no_readable_files"));
    }
    if ctx.message.trim().is_empty() && sections.is_empty() {
        return Err(
            AgentResponse::failure("Nothing to process: provide a message, code or files")
                .with_metadata("error", "empty_request"),
        );
    }

    let language = ctx
        .language
        .as_deref()
        .or(detected)
        .unwrap_or(default_language);

    let mut prompt = String::new();
    if !ctx.message.trim().is_empty() {
        prompt.push_str(&format!("Request: {}\n\n", ctx.message.trim()));
    }
    prompt.push_str(&format!("Language: {}\n\n", language));
    for section in &sections {
        prompt.push_str(section);
        prompt.push_str("\n\n");
    }
    for note in &notes {
        prompt.push_str(&format!("> Note: {}\n", note));
    }
    if !notes.is_empty() {
        prompt.push('\n');
    }
    prompt.push_str(task);
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn embeds_code_and_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("app.rs"), "fn main() {}").unwrap();
        let files = FileReader::new(dir.path());
        let ctx = TaskContext::new("review this")
            .with_code("x = 1")
            .with_files(vec!["app.rs".into(), "missing.rs".into()]);

        let prompt = context_prompt(&files, &ctx, "python", "Do the task.").unwrap();

        assert!(prompt.starts_with("Request: review this"));
        assert!(prompt.contains("Language: rust"));
        assert!(prompt.contains("```python\nx = 1\n```"));
        assert!(prompt.contains("File: app.rs\n```rust\nfn main() {}\n```"));
        assert!(prompt.contains("> Note: Could not read missing.rs"));
        assert!(prompt.ends_with("Do the task."));
    }

    #[test]
    fn fails_when_no_file_is_readable() {
        let dir = TempDir::new().unwrap();
        let files = FileReader::new(dir.path());
        let ctx = TaskContext::new("review").with_files(vec!["missing.py".into()]);

        let failure = context_prompt(&files, &ctx, "python", "task").unwrap_err();
        assert!(!failure.success);
        assert_eq!(failure.metadata["error"], "no_readable_files");
    }

    #[test]
    fn fails_on_empty_request() {
        let files = FileReader::new(".");
        let failure = context_prompt(&files, &TaskContext::default(), "python", "task").unwrap_err();
        assert_eq!(failure.metadata["error"], "empty_request");
    }

    #[test]
    fn message_only_requests_are_allowed() {
        let files = FileReader::new(".");
        let ctx = TaskContext::new("How should I layer this service?");
        let prompt = context_prompt(&files, &ctx, "python", "task").unwrap();
        assert!(prompt.contains("How should I layer this service?"));
        assert!(prompt.contains("Language: python"));
    }
}
