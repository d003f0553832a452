use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ModelConfig;
use crate::copilots::CopilotKind;

/// Project-local configuration file name
pub const PROJECT_CONFIG_FILE: &str = "copilot-ia.toml";

const DEFAULT_CACHE_DIR: &str = "data/cache";
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_FILE_SIZE: u64 = 1_000_000;

/// `[model]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    /// Overrides every copilot's default temperature when set
    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// `[cache]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default)]
    pub default_ttl_secs: Option<u64>,

    #[serde(default)]
    pub enabled: Option<bool>,
}

impl CacheSettings {
    pub fn dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// `[server]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!(
            "{}:{}",
            self.host.as_deref().unwrap_or(DEFAULT_HOST),
            self.port.unwrap_or(DEFAULT_PORT)
        )
    }
}

/// `[files]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub max_file_size: Option<u64>,

    /// Extensions (".vue") or bare file names ("Justfile") to allow on top of the defaults
    #[serde(default)]
    pub extra_extensions: Vec<String>,
}

impl FileSettings {
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE)
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub files: FileSettings,
}

impl ProjectConfig {
    /// Load configuration with precedence: env > project file > global file > defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(global) = global_config_path() {
            if global.exists() {
                config.merge(Self::from_file(&global)?);
            }
        }

        let project = Path::new(PROJECT_CONFIG_FILE);
        if project.exists() {
            config.merge(Self::from_file(project)?);
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a single TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Overlay `other` on top of `self`; values set in `other` win.
    pub fn merge(&mut self, other: Self) {
        let Self {
            model,
            cache,
            server,
            files,
        } = other;

        self.model.provider = model.provider.or(self.model.provider.take());
        self.model.name = model.name.or(self.model.name.take());
        self.model.temperature = model.temperature.or(self.model.temperature);
        self.model.max_tokens = model.max_tokens.or(self.model.max_tokens);

        self.cache.dir = cache.dir.or(self.cache.dir.take());
        self.cache.default_ttl_secs = cache.default_ttl_secs.or(self.cache.default_ttl_secs);
        self.cache.enabled = cache.enabled.or(self.cache.enabled);

        self.server.host = server.host.or(self.server.host.take());
        self.server.port = server.port.or(self.server.port);

        self.files.max_file_size = files.max_file_size.or(self.files.max_file_size);
        self.files.extra_extensions.extend(files.extra_extensions);
    }

    /// Apply `COPILOT_*` environment overrides using the given lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(provider) = lookup("COPILOT_PROVIDER") {
            self.model.provider = Some(provider);
        }
        if let Some(model) = lookup("COPILOT_MODEL") {
            self.model.name = Some(model);
        }
        if let Some(temperature) = lookup("COPILOT_TEMPERATURE") {
            let value = temperature
                .parse::<f32>()
                .with_context(|| format!("invalid COPILOT_TEMPERATURE: {}", temperature))?;
            self.model.temperature = Some(value);
        }
        if let Some(max_tokens) = lookup("COPILOT_MAX_TOKENS") {
            let value = max_tokens
                .parse::<u32>()
                .with_context(|| format!("invalid COPILOT_MAX_TOKENS: {}", max_tokens))?;
            self.model.max_tokens = Some(value);
        }
        if let Some(dir) = lookup("COPILOT_CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Provider backend name, defaulting to openai
    pub fn provider_name(&self) -> &str {
        self.model.provider.as_deref().unwrap_or("openai")
    }

    /// Effective model parameters for one copilot kind
    pub fn model_for(&self, kind: CopilotKind) -> ModelConfig {
        let provider = self.provider_name();
        let name = self
            .model
            .name
            .clone()
            .unwrap_or_else(|| default_model(provider).to_string());

        let mut model = ModelConfig::new(provider, name)
            .with_temperature(self.model.temperature.unwrap_or(kind.default_temperature()));
        if let Some(max_tokens) = self.model.max_tokens {
            model = model.with_max_tokens(max_tokens);
        }
        model
    }
}

/// Default model name for a provider backend
pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "anthropic" => "claude-sonnet-4-20250514",
        "groq" => "llama-3.3-70b-versatile",
        _ => "gpt-4o",
    }
}

fn global_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("copilot-ia")
            .join("config.toml"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_use_openai_and_kind_temperature() {
        let config = ProjectConfig::default();
        let review = config.model_for(CopilotKind::CodeReviewer);
        assert_eq!(review.provider, "openai");
        assert_eq!(review.name, "gpt-4o");
        assert_eq!(review.temperature, 0.2);
        assert_eq!(review.max_tokens, 4096);

        let docs = config.model_for(CopilotKind::Documentation);
        assert_eq!(docs.temperature, 0.4);
    }

    #[test]
    fn explicit_temperature_overrides_kind_default() {
        let mut config = ProjectConfig::default();
        config.model.temperature = Some(0.9);
        assert_eq!(config.model_for(CopilotKind::Security).temperature, 0.9);
    }

    #[test]
    fn provider_picks_its_default_model() {
        let mut config = ProjectConfig::default();
        config.model.provider = Some("anthropic".to_string());
        assert_eq!(
            config.model_for(CopilotKind::Testing).name,
            "claude-sonnet-4-20250514"
        );
    }

    #[test]
    fn parses_toml_sections() {
        let config: ProjectConfig = toml::from_str(
            r#"
            [model]
            provider = "groq"
            max_tokens = 1024

            [cache]
            dir = "/tmp/copilot-cache"
            default_ttl_secs = 60
            enabled = false

            [server]
            port = 9000

            [files]
            extra_extensions = [".vue", "Justfile"]
            "#,
        )
        .unwrap();

        assert_eq!(config.provider_name(), "groq");
        assert_eq!(config.cache.dir(), PathBuf::from("/tmp/copilot-cache"));
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(60));
        assert!(!config.cache.is_enabled());
        assert_eq!(config.server.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.files.extra_extensions.len(), 2);
        assert_eq!(config.model_for(CopilotKind::Debug).max_tokens, 1024);
    }

    #[test]
    fn merge_prefers_overlay_values() {
        let mut base: ProjectConfig = toml::from_str(
            r#"
            [model]
            provider = "openai"
            name = "gpt-4o-mini"
            "#,
        )
        .unwrap();
        let overlay: ProjectConfig = toml::from_str(
            r#"
            [model]
            provider = "anthropic"
            "#,
        )
        .unwrap();

        base.merge(overlay);
        assert_eq!(base.provider_name(), "anthropic");
        assert_eq!(base.model.name.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = ProjectConfig::default();
        config.model.provider = Some("openai".to_string());

        config
            .apply_env(env(&[
                ("COPILOT_PROVIDER", "anthropic"),
                ("COPILOT_TEMPERATURE", "0.5"),
                ("COPILOT_CACHE_DIR", "/tmp/elsewhere"),
            ]))
            .unwrap();

        assert_eq!(config.provider_name(), "anthropic");
        assert_eq!(config.model.temperature, Some(0.5));
        assert_eq!(config.cache.dir(), PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn env_rejects_invalid_numbers() {
        let mut config = ProjectConfig::default();
        let result = config.apply_env(env(&[("COPILOT_MAX_TOKENS", "lots")]));
        assert!(result.is_err());
    }
}
