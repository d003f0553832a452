use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{CopilotKind, context_prompt, default_language, fenced};
use crate::agents::{AgentResponse, Copilot, CopilotAgent, TaskContext};
use crate::tools::FileReader;

pub(crate) const INSTRUCTIONS: &str = "\
You are a software debugging expert.

## Mission

Help developers find and fix bugs efficiently.

## Debugging process

1. **Understand the problem**: read the error message, interpret the stack
   trace, compare expected and actual behavior.
2. **Find the root cause**: look for the real origin instead of treating
   symptoms, and consider context and dependencies.
3. **Propose a fix**: give a targeted fix with corrected code when possible.
4. **Prevent recurrence**: suggest tests for the case and point out
   problematic patterns.

## Common error types

- **Runtime errors**: null dereference, type errors, index out of range
- **Logic errors**: wrong behavior without a crash
- **Race conditions**: concurrency problems
- **Memory issues**: leaks, buffer overflows
- **Integration errors**: problems between components

## Response format

1. **Root cause**
2. **Explanation**
3. **Fix**: corrected code with an explanation
4. **Prevention**
";

const DEBUG_TASK: &str = "\
Provide:
1. **Root cause**: what is causing this?
2. **Explanation**: why does it happen?
3. **Fix**: how to correct it, with code if possible
4. **Prevention**: how to avoid it in the future";

fn default_level() -> String {
    "intermediate".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum DebugTask {
    AnalyzeError {
        error_message: String,
        #[serde(default)]
        stack_trace: Option<String>,
        #[serde(default)]
        code: Option<String>,
        #[serde(default = "default_language")]
        language: String,
    },
    DebugBehavior {
        code: String,
        expected: String,
        actual: String,
        #[serde(default = "default_language")]
        language: String,
    },
    ExplainError {
        error_message: String,
    },
    ExplainCode {
        code: String,
        #[serde(default = "default_language")]
        language: String,
        #[serde(default = "default_level")]
        level: String,
    },
    TraceExecution {
        code: String,
        inputs: BTreeMap<String, Value>,
        #[serde(default = "default_language")]
        language: String,
    },
    AnalyzeStackTrace {
        stack_trace: String,
        #[serde(default = "default_language")]
        language: String,
    },
    SuggestDebugSteps {
        problem: String,
        #[serde(default)]
        code: Option<String>,
    },
    FixCode {
        code: String,
        error: String,
        #[serde(default = "default_language")]
        language: String,
    },
}

/// Explains errors and finds root causes
#[derive(Debug)]
pub struct DebugCopilot {
    agent: CopilotAgent,
    files: FileReader,
}

impl DebugCopilot {
    pub fn new(agent: CopilotAgent, files: FileReader) -> Self {
        Self { agent, files }
    }

    pub async fn analyze_error(
        &self,
        error_message: &str,
        stack_trace: Option<&str>,
        code: Option<&str>,
        language: &str,
    ) -> AgentResponse {
        let mut parts = vec![
            "Analyze the following error and help resolve it:".to_string(),
            String::new(),
            "**Error message:**".to_string(),
            fenced("", error_message),
        ];
        if let Some(trace) = stack_trace.filter(|t| !t.trim().is_empty()) {
            parts.push(String::new());
            parts.push("**Stack trace:**".to_string());
            parts.push(fenced("", trace));
        }
        if let Some(code) = code.filter(|c| !c.trim().is_empty()) {
            parts.push(String::new());
            parts.push(format!("**Relevant code ({language}):**"));
            parts.push(fenced(language, code));
        }
        parts.push(String::new());
        parts.push(DEBUG_TASK.to_string());

        self.agent.run(&parts.join("\n")).await
    }

    /// Explain why `code` does `actual` instead of `expected`.
    pub async fn debug_behavior(
        &self,
        code: &str,
        expected: &str,
        actual: &str,
        language: &str,
    ) -> AgentResponse {
        let prompt = format!(
            "The code is not behaving as expected.\n\n\
             **Expected behavior:**\n{expected}\n\n\
             **Actual behavior:**\n{actual}\n\n\
             **Code:**\n{}\n\n\
             Please:\n\
             1. Identify why the behavior differs from what is expected\n\
             2. Explain the logic causing the problem\n\
             3. Provide the corrected code\n\
             4. Suggest how to test the fix",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn explain_error(&self, error_message: &str) -> AgentResponse {
        let prompt = format!(
            "Explain the following error message to a developer:\n\n{}\n\n\
             Provide:\n\
             1. What the error means\n\
             2. Common causes\n\
             3. How to investigate\n\
             4. Example fixes",
            fenced("", error_message)
        );
        self.agent.run(&prompt).await
    }

    /// `level` is beginner, intermediate or advanced
    pub async fn explain_code(&self, code: &str, language: &str, level: &str) -> AgentResponse {
        let prompt = format!(
            "Explain what the following code does (level: {level}):\n\n{}\n\n\
             Include:\n\
             1. The overall purpose\n\
             2. A step by step walkthrough\n\
             3. Inputs and outputs\n\
             4. Possible problems or improvements",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn trace_execution(
        &self,
        code: &str,
        inputs: &BTreeMap<String, Value>,
        language: &str,
    ) -> AgentResponse {
        let input_lines = inputs
            .iter()
            .map(|(name, value)| format!("- {} = {}", name, value))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Simulate running the following code with the given inputs:\n\n\
             **Code:**\n{}\n\n\
             **Inputs:**\n{input_lines}\n\n\
             Give a detailed trace:\n\
             1. The value of each variable at each step\n\
             2. The result of each expression\n\
             3. Control flow (conditionals, loops)\n\
             4. The final result\n\n\
             If the simulation hits an error, explain where and why.",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn analyze_stack_trace(&self, stack_trace: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Analyze the following stack trace ({language}):\n\n{}\n\n\
             Provide:\n\
             1. **Main error**: which exception or error occurred?\n\
             2. **Location**: exact file and line\n\
             3. **Call stack**: the sequence of calls leading to the error\n\
             4. **Context**: what was most likely happening\n\
             5. **Next steps**: what to investigate first",
            fenced("", stack_trace)
        );
        self.agent.run(&prompt).await
    }

    pub async fn suggest_debug_steps(&self, problem: &str, code: Option<&str>) -> AgentResponse {
        let code_section = code
            .map(|c| format!("\n\n**Related code:**\n{}", fenced("", c)))
            .unwrap_or_default();
        let prompt = format!(
            "Suggest debugging steps for the following problem:\n\n\
             **Problem:**\n{problem}{code_section}\n\n\
             Give a debugging plan:\n\
             1. **Hypotheses**: possible causes\n\
             2. **Checks**: what to verify first\n\
             3. **Tools**: useful tools and commands\n\
             4. **Debug points**: where to put breakpoints or logs\n\
             5. **Tests**: how to isolate the problem"
        );
        self.agent.run(&prompt).await
    }

    pub async fn fix_code(&self, code: &str, error: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Fix the following code:\n\n\
             **Broken code:**\n{}\n\n\
             **Error or problem:**\n{error}\n\n\
             Provide:\n\
             1. **Corrected code** (complete and working)\n\
             2. **Changes made** (a list of the edits)\n\
             3. **Explanation** (why the fix works)",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn execute(&self, task: DebugTask) -> AgentResponse {
        match task {
            DebugTask::AnalyzeError {
                error_message,
                stack_trace,
                code,
                language,
            } => {
                self.analyze_error(
                    &error_message,
                    stack_trace.as_deref(),
                    code.as_deref(),
                    &language,
                )
                .await
            }
            DebugTask::DebugBehavior {
                code,
                expected,
                actual,
                language,
            } => {
                self.debug_behavior(&code, &expected, &actual, &language)
                    .await
            }
            DebugTask::ExplainError { error_message } => self.explain_error(&error_message).await,
            DebugTask::ExplainCode {
                code,
                language,
                level,
            } => self.explain_code(&code, &language, &level).await,
            DebugTask::TraceExecution {
                code,
                inputs,
                language,
            } => self.trace_execution(&code, &inputs, &language).await,
            DebugTask::AnalyzeStackTrace {
                stack_trace,
                language,
            } => self.analyze_stack_trace(&stack_trace, &language).await,
            DebugTask::SuggestDebugSteps { problem, code } => {
                self.suggest_debug_steps(&problem, code.as_deref()).await
            }
            DebugTask::FixCode {
                code,
                error,
                language,
            } => self.fix_code(&code, &error, &language).await,
        }
    }
}

#[async_trait]
impl Copilot for DebugCopilot {
    fn kind(&self) -> CopilotKind {
        CopilotKind::Debug
    }

    fn agent(&self) -> &CopilotAgent {
        &self.agent
    }

    async fn process(&self, context: &TaskContext) -> AgentResponse {
        match context_prompt(&self.files, context, super::DEFAULT_LANGUAGE, DEBUG_TASK) {
            Ok(prompt) => self.agent.run(&prompt).await,
            Err(failure) => failure,
        }
    }
}
