use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CopilotKind, context_prompt, default_language, fenced, read_source};
use crate::agents::{AgentResponse, Copilot, CopilotAgent, TaskContext};
use crate::tools::FileReader;

pub(crate) const INSTRUCTIONS: &str = "\
You are a code refactoring expert.

## Mission

Improve code quality through refactorings that keep existing behavior, raise
readability and maintainability, reduce complexity and follow design
principles.

## Code smells to look for

1. **Bloaters**: long method, large class, primitive obsession, long
   parameter list.
2. **Object-orientation abusers**: sprawling switch statements, temporary
   fields, refused bequest.
3. **Change preventers**: divergent change, shotgun surgery.
4. **Dispensables**: comments covering for bad code, duplicate code, lazy
   classes, dead code.
5. **Couplers**: feature envy, inappropriate intimacy, message chains.

## Techniques

- Extract method or class
- Inline method or variable
- Rename
- Move method or field
- Replace conditional with polymorphism
- Introduce parameter object

## Response format

1. **Code smells found**, with locations
2. **Suggested refactorings** for each smell
3. **Refactored code**, before and after
4. **Benefits**
";

/// Catalogue refactorings accepted by [`RefactoringCopilot::apply_refactoring`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefactoringKind {
    ExtractMethod,
    ExtractClass,
    InlineMethod,
    Rename,
    MoveMethod,
    #[serde(rename = "replace_conditional_with_polymorphism")]
    ReplaceConditional,
    IntroduceParameterObject,
    PreserveWholeObject,
    #[serde(rename = "replace_magic_number_with_constant")]
    ReplaceMagicNumber,
    EncapsulateField,
    DecomposeConditional,
    ConsolidateConditional,
    RemoveDeadCode,
}

impl RefactoringKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractMethod => "extract method",
            Self::ExtractClass => "extract class",
            Self::InlineMethod => "inline method",
            Self::Rename => "rename",
            Self::MoveMethod => "move method",
            Self::ReplaceConditional => "replace conditional with polymorphism",
            Self::IntroduceParameterObject => "introduce parameter object",
            Self::PreserveWholeObject => "preserve whole object",
            Self::ReplaceMagicNumber => "replace magic number with constant",
            Self::EncapsulateField => "encapsulate field",
            Self::DecomposeConditional => "decompose conditional",
            Self::ConsolidateConditional => "consolidate conditional",
            Self::RemoveDeadCode => "remove dead code",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum RefactoringTask {
    IdentifySmells {
        code: String,
        #[serde(default = "default_language")]
        language: String,
    },
    SuggestRefactoring {
        code: String,
        #[serde(default = "default_language")]
        language: String,
        #[serde(default)]
        focus: Vec<String>,
    },
    RefactorFile {
        path: PathBuf,
        #[serde(default)]
        focus: Vec<String>,
    },
    ApplyRefactoring {
        code: String,
        refactoring: RefactoringKind,
        target: String,
        #[serde(default = "default_language")]
        language: String,
    },
    ApplyPattern {
        code: String,
        pattern: String,
        #[serde(default = "default_language")]
        language: String,
    },
    SimplifyCode {
        code: String,
        #[serde(default = "default_language")]
        language: String,
    },
    ExtractMethod {
        code: String,
        lines: String,
        method_name: String,
        #[serde(default = "default_language")]
        language: String,
    },
    RemoveDuplication {
        code: String,
        #[serde(default = "default_language")]
        language: String,
    },
    ImproveNaming {
        code: String,
        #[serde(default = "default_language")]
        language: String,
    },
    ModernizeCode {
        code: String,
        #[serde(default = "default_language")]
        language: String,
        #[serde(default)]
        target_version: Option<String>,
    },
}

#[derive(Debug)]
pub struct RefactoringCopilot {
    agent: CopilotAgent,
    files: FileReader,
}

impl RefactoringCopilot {
    pub fn new(agent: CopilotAgent, files: FileReader) -> Self {
        Self { agent, files }
    }

    pub async fn identify_smells(&self, code: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Analyze the code below and identify ALL code smells:\n\n{}\n\n\
             For each smell found:\n\n\
             | Code smell | Location | Severity | Description |\n\
             |------------|----------|----------|-------------|\n\
             | Name | Line or function | High/Medium/Low | Short description |\n\n\
             After the table, explain each smell and its impact on maintainability.",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    /// `focus` narrows the suggestions, e.g. readability or performance.
    pub async fn suggest_refactoring(
        &self,
        code: &str,
        language: &str,
        focus: &[String],
    ) -> AgentResponse {
        let focus_line = if focus.is_empty() {
            String::new()
        } else {
            format!("\n\nFocus especially on: {}", focus.join(", "))
        };
        let prompt = format!(
            "Suggest refactorings to improve the following code:\n\n{}{focus_line}\n\n\
             For each suggestion:\n\
             1. **Problem**: which smell or issue\n\
             2. **Technique**: which refactoring to apply\n\
             3. **Before and after**: show the change\n\
             4. **Benefits**: why it is an improvement",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn refactor_file(&self, path: &Path, focus: &[String]) -> AgentResponse {
        match read_source(&self.files, path) {
            Ok(source) => {
                self.suggest_refactoring(&source.code, source.language, focus)
                    .await
            }
            Err(failure) => failure,
        }
    }

    pub async fn apply_refactoring(
        &self,
        code: &str,
        refactoring: RefactoringKind,
        target: &str,
        language: &str,
    ) -> AgentResponse {
        let prompt = format!(
            "Apply the **{}** refactoring to the following code:\n\n\
             **Target:** {target}\n\n{}\n\n\
             Provide:\n\
             1. The fully refactored code\n\
             2. A list of every change made\n\
             3. The reason for each change",
            refactoring.as_str(),
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn apply_pattern(&self, code: &str, pattern: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Refactor the code below by applying the **{pattern}** design pattern:\n\n{}\n\n\
             Provide:\n\
             1. **Refactored code**: a complete implementation of the pattern\n\
             2. **Diagram** (ASCII or Mermaid): the pattern's structure\n\
             3. **Explanation**: how the pattern solves the problem\n\
             4. **Benefits**\n\
             5. **Trade-offs**",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn simplify_code(&self, code: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Simplify the following code while keeping its behavior:\n\n{}\n\n\
             Focus on:\n\
             - Reducing cyclomatic complexity\n\
             - Removing unnecessary code\n\
             - Improving readability\n\
             - Using idiomatic language features\n\n\
             Give the simplified code and explain each simplification.",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    /// Move the described `lines` into a new method named `method_name`.
    pub async fn extract_method(
        &self,
        code: &str,
        lines: &str,
        method_name: &str,
        language: &str,
    ) -> AgentResponse {
        let prompt = format!(
            "Extract the indicated lines into a new method:\n\n\
             **Original code:**\n{}\n\n\
             **Lines to extract:** {lines}\n\
             **New method name:** {method_name}\n\n\
             Provide:\n\
             1. The extracted method, documented\n\
             2. The original code changed to call it\n\
             3. The parameters the new method needs",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn remove_duplication(&self, code: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Find and remove duplication in the following code:\n\n{}\n\n\
             For each duplication:\n\
             1. Identify the duplicated code\n\
             2. Create a suitable abstraction (function, type, constant)\n\
             3. Rewrite the call sites to use it\n\n\
             Give the complete refactored code without duplication.",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn improve_naming(&self, code: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Improve the naming in the following code:\n\n{}\n\n\
             Find and rename:\n\
             - Variables with undescriptive names\n\
             - Functions whose names do not say what they do\n\
             - Confusing type names\n\
             - Unclear abbreviations\n\n\
             Give a table of renames and the updated code.\n\n\
             | Original | New | Reason |\n\
             |----------|-----|--------|",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn modernize_code(
        &self,
        code: &str,
        language: &str,
        target_version: Option<&str>,
    ) -> AgentResponse {
        let version = target_version
            .map(|v| format!(" (version {})", v))
            .unwrap_or_default();
        let prompt = format!(
            "Modernize the following {language} code{version}:\n\n{}\n\n\
             Use modern features such as:\n\
             - Comprehensions and iterator chains\n\
             - String interpolation\n\
             - Destructuring and pattern matching\n\
             - Type annotations\n\
             - async/await where appropriate\n\n\
             Give the modernized code and explain each change.",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn execute(&self, task: RefactoringTask) -> AgentResponse {
        match task {
            RefactoringTask::IdentifySmells { code, language } => {
                self.identify_smells(&code, &language).await
            }
            RefactoringTask::SuggestRefactoring {
                code,
                language,
                focus,
            } => self.suggest_refactoring(&code, &language, &focus).await,
            RefactoringTask::RefactorFile { path, focus } => self.refactor_file(&path, &focus).await,
            RefactoringTask::ApplyRefactoring {
                code,
                refactoring,
                target,
                language,
            } => {
                self.apply_refactoring(&code, refactoring, &target, &language)
                    .await
            }
            RefactoringTask::ApplyPattern {
                code,
                pattern,
                language,
            } => self.apply_pattern(&code, &pattern, &language).await,
            RefactoringTask::SimplifyCode { code, language } => {
                self.simplify_code(&code, &language).await
            }
            RefactoringTask::ExtractMethod {
                code,
                lines,
                method_name,
                language,
            } => {
                self.extract_method(&code, &lines, &method_name, &language)
                    .await
            }
            RefactoringTask::RemoveDuplication { code, language } => {
                self.remove_duplication(&code, &language).await
            }
            RefactoringTask::ImproveNaming { code, language } => {
                self.improve_naming(&code, &language).await
            }
            RefactoringTask::ModernizeCode {
                code,
                language,
                target_version,
            } => {
                self.modernize_code(&code, &language, target_version.as_deref())
                    .await
            }
        }
    }
}

#[async_trait]
impl Copilot for RefactoringCopilot {
    fn kind(&self) -> CopilotKind {
        CopilotKind::Refactoring
    }

    fn agent(&self) -> &CopilotAgent {
        &self.agent
    }

    async fn process(&self, context: &TaskContext) -> AgentResponse {
        match context_prompt(
            &self.files,
            context,
            super::DEFAULT_LANGUAGE,
            "Identify code smells in the code above and suggest refactorings, showing before and after.",
        ) {
            Ok(prompt) => self.agent.run(&prompt).await,
            Err(failure) => failure,
        }
    }
}
