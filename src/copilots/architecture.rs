use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CopilotKind, context_prompt, default_language, fenced, file_failure};
use crate::agents::{AgentResponse, Copilot, CopilotAgent, TaskContext};
use crate::tools::FileReader;

pub(crate) const INSTRUCTIONS: &str = "\
You are an experienced software architect.

## Mission

Guide developers through architectural decisions that lead to scalable,
maintainable, well structured systems.

## Expertise

1. **Software architecture**: clean architecture, hexagonal architecture,
   microservices versus monolith, event-driven architecture, CQRS and event
   sourcing.
2. **Design patterns**: creational (factory, builder), structural (adapter,
   facade, decorator) and behavioral (strategy, observer, command).
3. **Design principles**: SOLID, DRY, KISS, YAGNI and separation of concerns.
4. **Quality attributes**: cohesion and coupling, testability, scalability
   and maintainability.

## Approach

1. Understand the context and requirements
2. Identify the trade-offs
3. Offer options with pros and cons
4. Recommend the best approach
5. Give practical examples

## Format

Use diagrams (ASCII or Mermaid) when they help. Always explain the trade-offs
of a decision.
";

/// Tree depth used when analyzing a project directory
const PROJECT_TREE_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStyle {
    #[default]
    Rest,
    GraphQl,
    Grpc,
}

impl fmt::Display for ApiStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rest => "REST",
            Self::GraphQl => "GraphQL",
            Self::Grpc => "gRPC",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum ArchitectureTask {
    AnalyzeStructure {
        tree: String,
        #[serde(default)]
        description: Option<String>,
    },
    SuggestArchitecture {
        requirements: String,
        #[serde(default)]
        constraints: Option<String>,
        #[serde(default)]
        tech_stack: Vec<String>,
    },
    EvaluateDecision {
        decision: String,
        context: String,
        #[serde(default)]
        alternatives: Vec<String>,
    },
    SuggestPattern {
        problem: String,
        #[serde(default)]
        code: Option<String>,
        #[serde(default = "default_language")]
        language: String,
    },
    ReviewDependencies {
        dependencies: BTreeMap<String, String>,
        #[serde(default = "default_project_type")]
        project_type: String,
    },
    DesignApi {
        requirements: String,
        #[serde(default)]
        style: ApiStyle,
    },
    PlanMigration {
        current: String,
        target: String,
        #[serde(default)]
        constraints: Option<String>,
    },
}

fn default_project_type() -> String {
    "web".to_string()
}

/// Advises on project structure, patterns and architectural decisions
#[derive(Debug)]
pub struct ArchitectureCopilot {
    agent: CopilotAgent,
    files: FileReader,
}

impl ArchitectureCopilot {
    pub fn new(agent: CopilotAgent, files: FileReader) -> Self {
        Self { agent, files }
    }

    pub async fn analyze_structure(&self, tree: &str, description: Option<&str>) -> AgentResponse {
        let description = description
            .map(|d| format!("\n\n**Project overview:**\n{}", d))
            .unwrap_or_default();
        let prompt = format!(
            "Analyze the project's architecture based on its structure:\n\n{}{description}\n\n\
             Evaluate:\n\
             1. **Overall organization**: does the structure make sense?\n\
             2. **Separation of concerns**: is the code well organized?\n\
             3. **Patterns in use**: which patterns can you identify?\n\
             4. **Strengths**: what is done well?\n\
             5. **Weaknesses**: what could be improved?\n\
             6. **Recommendations**: specific changes to make",
            fenced("", tree)
        );
        self.agent.run(&prompt).await
    }

    /// Analyze the directory tree and file statistics of `dir`.
    pub async fn analyze_project(&self, dir: &Path) -> AgentResponse {
        let tree = match self.files.directory_structure(dir, PROJECT_TREE_DEPTH, true) {
            Ok(tree) => tree,
            Err(e) => return file_failure(&e),
        };
        let description = self.files.project_summary(dir).ok().map(|summary| {
            let types = summary
                .file_types
                .iter()
                .take(10)
                .map(|(ext, count)| format!("{} ({})", ext, count))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "{} files, {} lines, {}. File types: {}",
                summary.total_files, summary.total_lines, summary.total_size_human, types
            )
        });
        self.analyze_structure(&tree, description.as_deref()).await
    }

    pub async fn suggest_architecture(
        &self,
        requirements: &str,
        constraints: Option<&str>,
        tech_stack: &[String],
    ) -> AgentResponse {
        let mut extra = String::new();
        if let Some(constraints) = constraints {
            extra.push_str(&format!("\n**Constraints:** {}", constraints));
        }
        if !tech_stack.is_empty() {
            extra.push_str(&format!("\n**Tech stack:** {}", tech_stack.join(", ")));
        }
        let prompt = format!(
            "Suggest an architecture for a project with the following requirements:\n\n\
             **Requirements:**\n{requirements}\n{extra}\n\n\
             Provide:\n\n\
             ## 1. Recommended architecture\n\
             - The chosen architectural pattern and why\n\
             - An architecture diagram (Mermaid)\n\n\
             ## 2. Main components\n\
             - Components or services and the responsibility of each\n\n\
             ## 3. Directory layout\n\n\
             ## 4. Recommended design patterns\n\
             - Which patterns to use and where\n\n\
             ## 5. Trade-offs\n\
             - Pros and cons of the chosen architecture\n\n\
             ## 6. Alternatives considered\n\
             - Other options and why they were not chosen"
        );
        self.agent.run(&prompt).await
    }

    pub async fn evaluate_decision(
        &self,
        decision: &str,
        context: &str,
        alternatives: &[String],
    ) -> AgentResponse {
        let alternatives = if alternatives.is_empty() {
            String::new()
        } else {
            let items = alternatives
                .iter()
                .map(|a| format!("- {}", a))
                .collect::<Vec<_>>()
                .join("\n");
            format!("\n\n**Alternatives considered:**\n{}", items)
        };
        let prompt = format!(
            "Evaluate the following architectural decision:\n\n\
             **Decision:** {decision}\n\
             **Context:** {context}{alternatives}\n\n\
             Provide:\n\n\
             ## Decision analysis\n\
             ### Pros\n\
             ### Cons\n\
             ### Risks\n\
             ### Impact\n\
             - Short term\n\
             - Long term\n\
             ### Recommendation\n\
             Is the decision sound? Should it stand or be reconsidered?"
        );
        self.agent.run(&prompt).await
    }

    pub async fn suggest_pattern(
        &self,
        problem: &str,
        code: Option<&str>,
        language: &str,
    ) -> AgentResponse {
        let code = code
            .map(|c| format!("\n\n**Current code:**\n{}", fenced(language, c)))
            .unwrap_or_default();
        let prompt = format!(
            "Suggest design patterns to solve the following problem:\n\n\
             **Problem:**\n{problem}{code}\n\n\
             For each suggested pattern:\n\
             1. **Pattern name**, e.g. Strategy\n\
             2. **Why it fits**: how it solves the problem\n\
             3. **Implementation**: a {language} code example\n\
             4. **Diagram**: the structure in Mermaid\n\
             5. **Trade-offs**: pros and cons"
        );
        self.agent.run(&prompt).await
    }

    pub async fn review_dependencies(
        &self,
        dependencies: &BTreeMap<String, String>,
        project_type: &str,
    ) -> AgentResponse {
        let deps = dependencies
            .iter()
            .map(|(name, version)| format!("- {}: {}", name, version))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Analyze the dependencies of this {project_type} project:\n\n\
             **Dependencies:**\n{deps}\n\n\
             Evaluate:\n\
             1. **Redundancy**: dependencies that do similar things\n\
             2. **Security risks**: dependencies with known vulnerabilities\n\
             3. **Maintenance**: abandoned or poorly maintained dependencies\n\
             4. **Weight**: dependencies too heavy for what they do\n\
             5. **Alternatives**: suggested replacements\n\
             6. **Missing**: dependencies that could help"
        );
        self.agent.run(&prompt).await
    }

    pub async fn design_api(&self, requirements: &str, style: ApiStyle) -> AgentResponse {
        let prompt = format!(
            "Design a {style} API based on the following requirements:\n\n\
             **Requirements:**\n{requirements}\n\n\
             Provide:\n\n\
             ## API design\n\
             ### Resources and endpoints\n\
             | Method | Endpoint | Description |\n\
             |--------|----------|-------------|\n\n\
             ### Data models\n\
             ### Authentication and authorization\n\
             ### Versioning strategy\n\
             ### Good practices\n\
             - Pagination\n\
             - Filtering\n\
             - Error handling\n\n\
             ### Example specification\n\
             A partial OpenAPI (or equivalent) specification."
        );
        self.agent.run(&prompt).await
    }

    pub async fn plan_migration(
        &self,
        current: &str,
        target: &str,
        constraints: Option<&str>,
    ) -> AgentResponse {
        let constraints = constraints
            .map(|c| format!("\n\n**Constraints:** {}", c))
            .unwrap_or_default();
        let prompt = format!(
            "Plan an architectural migration:\n\n\
             **Current state:**\n{current}\n\n\
             **Target state:**\n{target}{constraints}\n\n\
             Provide:\n\n\
             ## Migration plan\n\
             ### Gap analysis\n\
             ### Migration phases\n\
             ### Risks and mitigations\n\
             | Risk | Likelihood | Impact | Mitigation |\n\n\
             ### Rollback strategy\n\
             ### Required testing for each phase\n\
             ### Estimated timeline"
        );
        self.agent.run(&prompt).await
    }

    pub async fn execute(&self, task: ArchitectureTask) -> AgentResponse {
        match task {
            ArchitectureTask::AnalyzeStructure { tree, description } => {
                self.analyze_structure(&tree, description.as_deref()).await
            }
            ArchitectureTask::SuggestArchitecture {
                requirements,
                constraints,
                tech_stack,
            } => {
                self.suggest_architecture(&requirements, constraints.as_deref(), &tech_stack)
                    .await
            }
            ArchitectureTask::EvaluateDecision {
                decision,
                context,
                alternatives,
            } => {
                self.evaluate_decision(&decision, &context, &alternatives)
                    .await
            }
            ArchitectureTask::SuggestPattern {
                problem,
                code,
                language,
            } => {
                self.suggest_pattern(&problem, code.as_deref(), &language)
                    .await
            }
            ArchitectureTask::ReviewDependencies {
                dependencies,
                project_type,
            } => self.review_dependencies(&dependencies, &project_type).await,
            ArchitectureTask::DesignApi {
                requirements,
                style,
            } => self.design_api(&requirements, style).await,
            ArchitectureTask::PlanMigration {
                current,
                target,
                constraints,
            } => {
                self.plan_migration(&current, &target, constraints.as_deref())
                    .await
            }
        }
    }
}

#[async_trait]
impl Copilot for ArchitectureCopilot {
    fn kind(&self) -> CopilotKind {
        CopilotKind::Architecture
    }

    fn agent(&self) -> &CopilotAgent {
        &self.agent
    }

    async fn process(&self, context: &TaskContext) -> AgentResponse {
        match context_prompt(
            &self.files,
            context,
            super::DEFAULT_LANGUAGE,
            "Evaluate the design above: structure, separation of concerns, patterns and trade-offs. Recommend concrete improvements.",
        ) {
            Ok(prompt) => self.agent.run(&prompt).await,
            Err(failure) => failure,
        }
    }
}
