use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Registration key for a copilot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopilotKind {
    CodeReviewer,
    Documentation,
    Testing,
    Debug,
    Refactoring,
    Architecture,
    Security,
}

impl CopilotKind {
    /// Every kind, in declaration order
    pub fn all() -> [CopilotKind; 7] {
        [
            Self::CodeReviewer,
            Self::Documentation,
            Self::Testing,
            Self::Debug,
            Self::Refactoring,
            Self::Architecture,
            Self::Security,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeReviewer => "code_reviewer",
            Self::Documentation => "documentation",
            Self::Testing => "testing",
            Self::Debug => "debug",
            Self::Refactoring => "refactoring",
            Self::Architecture => "architecture",
            Self::Security => "security",
        }
    }

    /// Human-facing agent name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CodeReviewer => "Code Reviewer",
            Self::Documentation => "Documentation Writer",
            Self::Testing => "Test Generator",
            Self::Debug => "Debug Assistant",
            Self::Refactoring => "Refactoring Expert",
            Self::Architecture => "Architecture Advisor",
            Self::Security => "Security Auditor",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::CodeReviewer => "Analyzes code, identifies problems and suggests improvements",
            Self::Documentation => "Generates documentation, docstrings and READMEs",
            Self::Testing => "Generates unit, integration and end-to-end tests",
            Self::Debug => "Analyzes errors, stack traces and unexpected behavior",
            Self::Refactoring => "Identifies code smells and proposes refactorings",
            Self::Architecture => "Advises on software architecture and design patterns",
            Self::Security => "Finds vulnerabilities and recommends security fixes",
        }
    }

    /// Sampling temperature used when the configuration sets none
    pub fn default_temperature(&self) -> f32 {
        match self {
            Self::CodeReviewer | Self::Debug | Self::Security => 0.2,
            Self::Testing | Self::Refactoring => 0.3,
            Self::Documentation | Self::Architecture => 0.4,
        }
    }

    /// System instructions for this copilot's agent
    pub fn instructions(&self) -> &'static str {
        match self {
            Self::CodeReviewer => super::reviewer::INSTRUCTIONS,
            Self::Documentation => super::documentation::INSTRUCTIONS,
            Self::Testing => super::testing::INSTRUCTIONS,
            Self::Debug => super::debug::INSTRUCTIONS,
            Self::Refactoring => super::refactoring::INSTRUCTIONS,
            Self::Architecture => super::architecture::INSTRUCTIONS,
            Self::Security => super::security::INSTRUCTIONS,
        }
    }
}

impl fmt::Display for CopilotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CopilotKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "code_reviewer" | "reviewer" | "review" => Ok(Self::CodeReviewer),
            "documentation" | "docs" => Ok(Self::Documentation),
            "testing" | "test" | "tests" => Ok(Self::Testing),
            "debug" => Ok(Self::Debug),
            "refactoring" | "refactor" => Ok(Self::Refactoring),
            "architecture" => Ok(Self::Architecture),
            "security" => Ok(Self::Security),
            _ => anyhow::bail!(
                "unknown copilot: {} (expected one of: {})",
                s,
                Self::all().map(|k| k.as_str()).join(", ")
            ),
        }
    }
}
