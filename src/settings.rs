use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::application::services::{ConfidenceMode, ContextBudget, QueryConfig};

const CONFIG_FILENAME: &str = "config.json";

/// Declarative list of answer generators compiled into the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum GeneratorBackend {
    /// Hosted model behind an OpenAI-compatible chat completions API.
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "default_openai_base_url")]
        base_url: String,
        #[serde(default = "default_openai_model")]
        model: String,
        /// Name of the environment variable holding the API key.
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Deterministic local stand-in, no network access.
    Offline,
}

impl GeneratorBackend {
    pub fn id(&self) -> &'static str {
        match self {
            GeneratorBackend::OpenAi { .. } => "openai",
            GeneratorBackend::Offline => "offline",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GeneratorBackend::OpenAi { .. } => "OpenAI-compatible chat completions",
            GeneratorBackend::Offline => "Offline (no model)",
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            GeneratorBackend::OpenAi { model, .. } => model,
            GeneratorBackend::Offline => "tanya/offline",
        }
    }

    pub fn with_default_model(id: &str) -> Option<Self> {
        match id {
            "openai" => Some(GeneratorBackend::OpenAi {
                base_url: default_openai_base_url(),
                model: default_openai_model(),
                api_key_env: default_api_key_env(),
                timeout_secs: default_timeout_secs(),
            }),
            "offline" => Some(GeneratorBackend::Offline),
            _ => None,
        }
    }

    /// Replace the model name where the backend has one.
    pub fn with_model(mut self, model_override: Option<String>) -> Self {
        if let Some(new_model) = model_override.and_then(|m| {
            let trimmed = m.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }) {
            if let GeneratorBackend::OpenAi { model, .. } = &mut self {
                *model = new_model;
            }
        }
        self
    }
}

impl Default for GeneratorBackend {
    fn default() -> Self {
        GeneratorBackend::OpenAi {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Everything persisted in `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub generator: GeneratorBackend,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Character cap for the assembled context; absent means no cap.
    #[serde(default)]
    pub context_budget_chars: Option<usize>,
    #[serde(default)]
    pub confidence: ConfidenceMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorBackend::default(),
            max_tokens: default_max_tokens(),
            context_budget_chars: None,
            confidence: ConfidenceMode::default(),
        }
    }
}

impl AppConfig {
    pub fn query_config(&self) -> QueryConfig {
        let budget = match self.context_budget_chars {
            Some(chars) => ContextBudget::chars(chars),
            None => ContextBudget::unbounded(),
        };
        QueryConfig::new(self.max_tokens, budget, self.confidence)
    }
}

/// Holds the active `AppConfig` and writes every change back to
/// `<data_dir>/config.json`.
pub struct ConfigManager {
    file: PathBuf,
    active: RwLock<AppConfig>,
}

impl ConfigManager {
    /// Read `config.json` from `data_dir`. A missing file gives defaults;
    /// an unreadable one is logged and replaced by defaults on next save.
    pub fn load(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = data_dir.as_ref().join(CONFIG_FILENAME);
        let config = match fs::read(&file) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(target: "tanya::settings", path = %file.display(), error = %err, "ignoring malformed config");
                AppConfig::default()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => AppConfig::default(),
            Err(err) => return Err(err),
        };

        Ok(Self {
            file,
            active: RwLock::new(config),
        })
    }

    pub fn current(&self) -> AppConfig {
        self.active.read().clone()
    }

    /// Switch the answer generator. Takes effect for handles built afterwards.
    pub fn set_generator(&self, backend: GeneratorBackend) -> std::io::Result<AppConfig> {
        self.update(|config| config.generator = backend)
    }

    /// Apply `change` and save the result.
    pub fn update(&self, change: impl FnOnce(&mut AppConfig)) -> std::io::Result<AppConfig> {
        let mut active = self.active.write();
        let mut next = active.clone();
        change(&mut next);
        self.save(&next)?;
        *active = next.clone();
        Ok(next)
    }

    fn save(&self, config: &AppConfig) -> std::io::Result<()> {
        if let Some(dir) = self.file.parent() {
            fs::create_dir_all(dir)?;
        }
        let staged = self.file.with_extension("json.tmp");
        fs::write(&staged, serde_json::to_vec_pretty(config)?)?;
        fs::rename(&staged, &self.file)
    }
}

pub fn available_generators() -> Vec<GeneratorBackend> {
    vec![GeneratorBackend::default(), GeneratorBackend::Offline]
}

const fn default_max_tokens() -> u32 {
    crate::application::services::prompts::DEFAULT_MAX_TOKENS
}

const fn default_timeout_secs() -> u64 {
    60
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::load(dir.path()).unwrap();

        let config = manager.current();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.query_config(), QueryConfig::default());
    }

    #[test]
    fn updates_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::load(dir.path()).unwrap();

        manager.set_generator(GeneratorBackend::Offline).unwrap();
        manager
            .update(|cfg| {
                cfg.context_budget_chars = Some(12_000);
                cfg.confidence = ConfidenceMode::TermOverlap;
            })
            .unwrap();

        let reloaded = ConfigManager::load(dir.path()).unwrap().current();
        assert_eq!(reloaded.generator, GeneratorBackend::Offline);
        assert_eq!(
            reloaded.query_config().context_budget,
            ContextBudget::chars(12_000)
        );
        assert_eq!(reloaded.confidence, ConfidenceMode::TermOverlap);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), b"{not json").unwrap();

        let manager = ConfigManager::load(dir.path()).unwrap();

        assert_eq!(manager.current(), AppConfig::default());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"generator":{"backend":"openai","model":"llama3"}}"#)
                .unwrap();

        assert_eq!(parsed.generator.model_name(), "llama3");
        assert_eq!(parsed.max_tokens, 1000);
        assert!(parsed.context_budget_chars.is_none());
    }

    #[test]
    fn model_override_applies_to_hosted_backend_only() {
        let hosted = GeneratorBackend::with_default_model("openai")
            .unwrap()
            .with_model(Some(" llama3 ".into()));
        assert_eq!(hosted.model_name(), "llama3");

        let offline = GeneratorBackend::Offline.with_model(Some("x".into()));
        assert_eq!(offline, GeneratorBackend::Offline);
        assert!(GeneratorBackend::with_default_model("nope").is_none());
    }
}
