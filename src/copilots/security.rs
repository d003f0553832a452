use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use super::{CopilotKind, context_prompt, default_language, fenced, read_source};
use crate::agents::{AgentResponse, Copilot, CopilotAgent, TaskContext};
use crate::tools::FileReader;

pub(crate) const INSTRUCTIONS: &str = "\
You are an application security (AppSec) specialist.

## Mission

Find security vulnerabilities and give practical recommendations to mitigate
them.

## OWASP Top 10 (2021)

1. **A01 Broken Access Control**: missing authorization checks, IDOR,
   privilege escalation.
2. **A02 Cryptographic Failures**: unencrypted sensitive data, weak
   algorithms, hardcoded keys.
3. **A03 Injection**: SQL, command, LDAP injection and XSS.
4. **A04 Insecure Design**: missing threat modeling, insecure patterns.
5. **A05 Security Misconfiguration**: insecure defaults, unneeded features
   enabled, verbose error messages.
6. **A06 Vulnerable Components**: outdated dependencies, libraries with known
   CVEs.
7. **A07 Authentication Failures**: weak passwords allowed, sessions that
   never expire, exposed credentials.
8. **A08 Data Integrity Failures**: insecure deserialization, unverified
   updates.
9. **A09 Logging Failures**: missing security logs, sensitive data in logs.
10. **A10 SSRF**: unvalidated server-side requests.

## Response format

For each vulnerability give the severity (critical, high, medium, low), the
OWASP category, the location in the code, the risk, the potential impact, the
recommended fix and corrected code when applicable.
";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum SecurityTask {
    VulnerabilityScan {
        code: String,
        #[serde(default = "default_language")]
        language: String,
    },
    ScanFile {
        path: PathBuf,
    },
    ReviewAuthentication {
        code: String,
        #[serde(default = "default_language")]
        language: String,
    },
    CheckInjection {
        code: String,
        #[serde(default = "default_language")]
        language: String,
    },
    CheckSensitiveData {
        code: String,
        #[serde(default = "default_language")]
        language: String,
    },
    ReviewDependencies {
        dependencies: String,
        #[serde(default = "default_language")]
        language: String,
    },
    GenerateSecurityChecklist {
        #[serde(default = "default_app_type")]
        app_type: String,
        #[serde(default)]
        framework: Option<String>,
    },
    SuggestSecurityHeaders {
        #[serde(default = "default_web_framework")]
        framework: String,
    },
    ReviewApiSecurity {
        api_spec: String,
        #[serde(default)]
        implementation: Option<String>,
    },
}

fn default_app_type() -> String {
    "web".to_string()
}

fn default_web_framework() -> String {
    "generic".to_string()
}

/// OWASP-oriented security auditing
#[derive(Debug)]
pub struct SecurityCopilot {
    agent: CopilotAgent,
    files: FileReader,
}

impl SecurityCopilot {
    pub fn new(agent: CopilotAgent, files: FileReader) -> Self {
        Self { agent, files }
    }

    pub async fn vulnerability_scan(&self, code: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Perform a complete security analysis of the following code:\n\n{}\n\n\
             For each vulnerability found, provide:\n\n\
             ## Vulnerabilities found\n\n\
             ### [SEVERITY] OWASP category\n\
             - **Location**: file:line\n\
             - **Description**: what the problem is\n\
             - **Impact**: what an attacker could do\n\
             - **CWE**: the related CWE id\n\
             - **Recommendation**: how to fix it\n\
             - **Corrected code**\n\n\
             ## Summary\n\
             - Total vulnerabilities: X\n\
             - Critical: X, High: X, Medium: X, Low: X\n\n\
             ## General recommendations",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn scan_file(&self, path: &Path) -> AgentResponse {
        match read_source(&self.files, path) {
            Ok(source) => self.vulnerability_scan(&source.code, source.language).await,
            Err(failure) => failure,
        }
    }

    pub async fn review_authentication(&self, code: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Analyze this authentication and authorization implementation:\n\n{}\n\n\
             Check:\n\n\
             ## Authentication\n\
             - [ ] Secure password storage (bcrypt, argon2)\n\
             - [ ] Brute force protection\n\
             - [ ] Multi-factor authentication\n\
             - [ ] Secure password recovery\n\n\
             ## Sessions\n\
             - [ ] Secure tokens (length, entropy)\n\
             - [ ] Appropriate expiry\n\
             - [ ] Invalidation on logout\n\
             - [ ] Session fixation protection\n\n\
             ## Authorization\n\
             - [ ] Checked on every request\n\
             - [ ] Least privilege\n\
             - [ ] Escalation protection\n\n\
             ## JWT (if used)\n\
             - [ ] Safe algorithm (never none)\n\
             - [ ] Full validation\n\
             - [ ] Short expiry\n\
             - [ ] Secure refresh tokens\n\n\
             Give specific recommendations for each problem found.",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn check_injection(&self, code: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Analyze the code for INJECTION vulnerabilities:\n\n{}\n\n\
             Check for:\n\n\
             ## SQL injection\n\
             - String concatenation in queries\n\
             - Missing prepared statements\n\
             - Misused ORMs\n\n\
             ## Command injection\n\
             - Shell or subprocess calls built from user input\n\
             - Missing sanitization\n\n\
             ## XSS\n\
             - Unescaped output\n\
             - innerHTML with user data\n\
             - Unsafe templates\n\n\
             ## LDAP injection\n\n\
             ## Path traversal\n\
             - File paths built from user input\n\n\
             For each vulnerability show:\n\
             1. The vulnerable code\n\
             2. How it could be exploited\n\
             3. The corrected code",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    pub async fn check_sensitive_data(&self, code: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Analyze the code for EXPOSURE OF SENSITIVE DATA:\n\n{}\n\n\
             Check:\n\n\
             ## Hardcoded credentials\n\
             - API keys, passwords, tokens, connection strings\n\n\
             ## Sensitive data in logs\n\
             - Logged passwords or tokens\n\
             - PII in error messages\n\n\
             ## Cryptography\n\
             - Unencrypted sensitive data\n\
             - Weak algorithms (MD5 or SHA1 for passwords)\n\
             - Keys in code\n\n\
             ## Transport\n\
             - HTTP instead of HTTPS\n\
             - Unvalidated certificates\n\n\
             ## Storage\n\
             - Sensitive data in cookies\n\
             - Cached sensitive data\n\n\
             List every problem found with its severity and fix.",
            fenced(language, code)
        );
        self.agent.run(&prompt).await
    }

    /// `dependencies` is a raw manifest such as requirements.txt or Cargo.toml.
    pub async fn review_dependencies(&self, dependencies: &str, language: &str) -> AgentResponse {
        let prompt = format!(
            "Analyze these dependencies for vulnerabilities:\n\n{}\n\n\
             Language or ecosystem: {language}\n\n\
             Check:\n\
             1. **Outdated versions**: very old releases, versions with known CVEs\n\
             2. **Abandoned dependencies**: unmaintained projects\n\
             3. **High risk dependencies**: libraries with a history of vulnerabilities\n\
             4. **Recommendations**: safe versions and safer alternatives\n\n\
             Format:\n\
             | Dependency | Current version | Risk | Safe version | CVEs |",
            fenced("", dependencies)
        );
        self.agent.run(&prompt).await
    }

    pub async fn generate_security_checklist(
        &self,
        app_type: &str,
        framework: Option<&str>,
    ) -> AgentResponse {
        let framework = framework
            .map(|f| format!(" using {}", f))
            .unwrap_or_default();
        let prompt = format!(
            "Write a complete security checklist for a {app_type} project{framework}.\n\n\
             The checklist must include:\n\n\
             ## Secure development\n\
             ## Authentication and authorization\n\
             ## Data protection\n\
             ## Configuration and deployment\n\
             ## Monitoring and logging\n\
             ## Security testing\n\n\
             Use `- [ ]` items. For each item, briefly describe how to verify or implement it."
        );
        self.agent.run(&prompt).await
    }

    pub async fn suggest_security_headers(&self, framework: &str) -> AgentResponse {
        let prompt = format!(
            "Suggest HTTP security headers for a {framework} application.\n\n\
             For each header give the value, its purpose and how to set it in {framework}:\n\n\
             - Content-Security-Policy\n\
             - X-Frame-Options\n\
             - Strict-Transport-Security\n\
             - X-Content-Type-Options\n\
             - Referrer-Policy\n\
             - Permissions-Policy\n\n\
             Include example code configuring them in {framework}."
        );
        self.agent.run(&prompt).await
    }

    pub async fn review_api_security(
        &self,
        api_spec: &str,
        implementation: Option<&str>,
    ) -> AgentResponse {
        let implementation = implementation
            .map(|code| format!("\n\n**Implementation:**\n{}", fenced("", code)))
            .unwrap_or_default();
        let prompt = format!(
            "Analyze the security of the following API:\n\n\
             **Specification:**\n{}{implementation}\n\n\
             Check:\n\n\
             ## Authentication\n\
             - The auth method used and how safe it is\n\n\
             ## Authorization\n\
             - Per-endpoint access control\n\
             - Rate limiting\n\n\
             ## Input validation\n\
             - Defined schemas\n\
             - Type validation\n\n\
             ## Data exposure\n\
             - Sensitive fields exposed\n\
             - Details leaked in error messages\n\n\
             ## Configuration\n\
             - CORS set up correctly\n\
             - Security headers\n\n\
             Give specific recommendations for each problem.",
            fenced("", api_spec)
        );
        self.agent.run(&prompt).await
    }

    pub async fn execute(&self, task: SecurityTask) -> AgentResponse {
        match task {
            SecurityTask::VulnerabilityScan { code, language } => {
                self.vulnerability_scan(&code, &language).await
            }
            SecurityTask::ScanFile { path } => self.scan_file(&path).await,
            SecurityTask::ReviewAuthentication { code, language } => {
                self.review_authentication(&code, &language).await
            }
            SecurityTask::CheckInjection { code, language } => {
                self.check_injection(&code, &language).await
            }
            SecurityTask::CheckSensitiveData { code, language } => {
                self.check_sensitive_data(&code, &language).await
            }
            SecurityTask::ReviewDependencies {
                dependencies,
                language,
            } => self.review_dependencies(&dependencies, &language).await,
            SecurityTask::GenerateSecurityChecklist {
                app_type,
                framework,
            } => {
                self.generate_security_checklist(&app_type, framework.as_deref())
                    .await
            }
            SecurityTask::SuggestSecurityHeaders { framework } => {
                self.suggest_security_headers(&framework).await
            }
            SecurityTask::ReviewApiSecurity {
                api_spec,
                implementation,
            } => {
                self.review_api_security(&api_spec, implementation.as_deref())
                    .await
            }
        }
    }
}

#[async_trait]
impl Copilot for SecurityCopilot {
    fn kind(&self) -> CopilotKind {
        CopilotKind::Security
    }

    fn agent(&self) -> &CopilotAgent {
        &self.agent
    }

    async fn process(&self, context: &TaskContext) -> AgentResponse {
        match context_prompt(
            &self.files,
            context,
            super::DEFAULT_LANGUAGE,
            "Audit the code above against the OWASP Top 10. For each vulnerability give severity, location, impact and a fix.",
        ) {
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
    use std::sync::Arc;
    use tempfile::TempDir;

    fn copilot(provider: Arc<RecordingProvider>, root: &Path) -> SecurityCopilot {
        let agent = CopilotAgent::new(
            "Security Auditor",
            "security",
            INSTRUCTIONS,
            ModelConfig::default(),
            provider,
        );
        SecurityCopilot::new(agent, FileReader::new(root))
    }

    #[tokio::test]
    async fn scan_file_reads_source() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("db.py"),
            "cursor.execute(\"SELECT * FROM users WHERE id = \" + user_id)",
        )
        .unwrap();
        let provider = Arc::new(RecordingProvider::replying("[HIGH] A03 Injection"));

        let response = copilot(provider.clone(), dir.path())
            .scan_file(Path::new("db.py"))
            .await;

        assert!(response.success);
        assert!(provider.last_prompt().contains("```python\ncursor.execute"));
    }

    #[tokio::test]
    async fn disallowed_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("secrets.bin"), [0u8, 1, 2]).unwrap();
        let provider = Arc::new(RecordingProvider::replying("ok"));

        let response = copilot(provider.clone(), dir.path())
            .scan_file(Path::new("secrets.bin"))
            .await;

        assert!(!response.success);
        assert_eq!(response.metadata["error"], "disallowed_extension");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn checklist_defaults_from_task() {
        let provider = Arc::new(RecordingProvider::replying("ok"));
        let task: SecurityTask =
            serde_json::from_str(r#"{"task": "generate_security_checklist", "framework": "axum"}"#)
                .unwrap();

        copilot(provider.clone(), Path::new(".")).execute(task).await;

        assert!(provider.last_prompt().contains("for a web project using axum"));
    }
}
