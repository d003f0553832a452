use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::copilots::CopilotKind;

/// What a free-form request is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskIntent {
    Review,
    Document,
    Test,
    Debug,
    Refactor,
    Architecture,
    Security,
    FullAnalysis,
}

impl TaskIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Document => "document",
            Self::Test => "test",
            Self::Debug => "debug",
            Self::Refactor => "refactor",
            Self::Architecture => "architecture",
            Self::Security => "security",
            Self::FullAnalysis => "full_analysis",
        }
    }

    /// Copilots that handle this intent
    pub fn copilots(&self) -> &'static [CopilotKind] {
        match self {
            Self::Review => &[CopilotKind::CodeReviewer],
            Self::Document => &[CopilotKind::Documentation],
            Self::Test => &[CopilotKind::Testing],
            Self::Debug => &[CopilotKind::Debug],
            Self::Refactor => &[CopilotKind::Refactoring],
            Self::Architecture => &[CopilotKind::Architecture],
            Self::Security => &[CopilotKind::Security],
            Self::FullAnalysis => &[
                CopilotKind::CodeReviewer,
                CopilotKind::Security,
                CopilotKind::Architecture,
            ],
        }
    }
}

impl fmt::Display for TaskIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords per intent, matched as lowercase substrings. English and
/// Portuguese requests are both common.
///
/// Review also answers to the bare verbs "analise", "analyze" and "analyse",
/// so "analyze this module" routes to the code reviewer instead of falling
/// through to the default.
const INTENT_KEYWORDS: &[(TaskIntent, &[&str])] = &[
    (
        TaskIntent::Review,
        &[
            "review",
            "revisar",
            "analisar código",
            "analise",
            "analyze",
            "analyse",
            "code review",
            "verificar",
        ],
    ),
    (
        TaskIntent::Document,
        &["document", "documentar", "docstring", "readme", "docs"],
    ),
    (
        TaskIntent::Test,
        &["test", "testar", "teste", "unit test", "testes"],
    ),
    (
        TaskIntent::Debug,
        &["debug", "bug", "erro", "error", "fix", "corrigir", "problema"],
    ),
    (
        TaskIntent::Refactor,
        &["refactor", "refatorar", "melhorar", "clean", "limpar"],
    ),
    (
        TaskIntent::Architecture,
        &["architecture", "arquitetura", "design", "estrutura"],
    ),
    (
        TaskIntent::Security,
        &["security", "segurança", "vulnerab", "owasp", "injection"],
    ),
    (
        TaskIntent::FullAnalysis,
        &["full", "completo", "completa", "tudo", "all"],
    ),
];

/// Classify a request by keyword. Falls back to `[Review]` when nothing matches.
pub fn detect_intent(message: &str) -> Vec<TaskIntent> {
    let lower = message.to_lowercase();
    let mut intents: Vec<TaskIntent> = INTENT_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(intent, _)| *intent)
        .collect();

    if intents.is_empty() {
        intents.push(TaskIntent::Review);
    }
    debug!(?intents, "detected intents");
    intents
}
