use crate::error::{Result, SetupError};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
    pub const OLLAMA_HOST: &str = "OLLAMA_HOST";
    pub const OLLAMA_MODEL: &str = "OLLAMA_MODEL";
    pub const OLLAMA_EMBED_MODEL: &str = "OLLAMA_EMBED_MODEL";
    pub const AMEM_SERVICE_URL: &str = "AMEM_SERVICE_URL";
    pub const AMEM_EMBEDDING_MODEL: &str = "AMEM_EMBEDDING_MODEL";
    pub const AMEM_SETUP_CONFIG: &str = "AMEM_SETUP_CONFIG";
    pub const AMEM_OFFLINE: &str = "AMEM_OFFLINE";
    pub const HF_HUB_OFFLINE: &str = "HF_HUB_OFFLINE";
    pub const TRANSFORMERS_OFFLINE: &str = "TRANSFORMERS_OFFLINE";
    /// Set to "1" to stop hub clients from picking up a stored token.
    pub const HF_HUB_DISABLE_IMPLICIT_TOKEN: &str = "HF_HUB_DISABLE_IMPLICIT_TOKEN";
    pub const HOME: &str = "HOME";

    /// Credentials that break anonymous model downloads when stale
    pub const HUB_TOKENS: [&str; 3] = ["HF_TOKEN", "HUGGINGFACE_TOKEN", "HF_API_TOKEN"];
}

/// Default values
pub mod defaults {
    pub const OLLAMA_HOST: &str = "http://localhost:11434";
    pub const OLLAMA_MODEL: &str = "llama3.2";
    pub const OLLAMA_EMBED_MODEL: &str = "all-minilm";
    pub const EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
    pub const AMEM_SERVICE_URL: &str = "http://127.0.0.1:21956";
    pub const OPENAI_MODEL: &str = "gpt-4o-mini";
    pub const ANTHROPIC_MODEL: &str = "claude-3-5-haiku-20241022";
    pub const ENV_FILE: &str = "memory-layer/.env.amem";
    pub const HELPER_SCRIPT: &str = "memory-layer/scripts/test_amem_simple.sh";
    pub const HUB_TOKEN_FILE: &str = ".huggingface/token";
    pub const CONFIG_FILE: &str = "amem-setup/config.json5";
    pub const PROBE_TIMEOUT_SECS: u64 = 5;
    pub const LAUNCH_DELAY_SECS: u64 = 3;
}

/// Process environment captured once at startup.
///
/// Empty values count as unset so `FOO=` behaves like a missing variable.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self { vars: std::env::vars().collect() }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str).filter(|value| !value.trim().is_empty())
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Truthy flag: `1`, `true`, `yes` or `on`
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| {
            matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAi,
    Anthropic,
    Ollama,
}

impl LlmBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            LlmBackend::OpenAi => "openai",
            LlmBackend::Anthropic => "anthropic",
            LlmBackend::Ollama => "ollama",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            LlmBackend::OpenAi => "OpenAI",
            LlmBackend::Anthropic => "Anthropic",
            LlmBackend::Ollama => "Ollama",
        }
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LLM backend handed to the memory system; `None` means keyword-only enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendChoice {
    pub backend: Option<LlmBackend>,
    pub model: Option<String>,
}

impl BackendChoice {
    pub fn none() -> Self {
        Self { backend: None, model: None }
    }

    pub fn ollama(model: impl Into<String>) -> Self {
        Self { backend: Some(LlmBackend::Ollama), model: Some(model.into()) }
    }

    pub fn describe(&self) -> String {
        match (&self.backend, &self.model) {
            (Some(backend), Some(model)) => format!("{} ({})", backend.display_name(), model),
            (Some(backend), None) => backend.display_name().to_string(),
            _ => "no LLM backend (basic keyword extraction)".to_string(),
        }
    }
}

/// Hosted keys in priority order: OpenAI, then Anthropic.
pub fn hosted_backend(env: &EnvSnapshot) -> Option<BackendChoice> {
    if env.is_set(env_vars::OPENAI_API_KEY) {
        Some(BackendChoice {
            backend: Some(LlmBackend::OpenAi),
            model: Some(defaults::OPENAI_MODEL.to_string()),
        })
    } else if env.is_set(env_vars::ANTHROPIC_API_KEY) {
        Some(BackendChoice {
            backend: Some(LlmBackend::Anthropic),
            model: Some(defaults::ANTHROPIC_MODEL.to_string()),
        })
    } else {
        None
    }
}

/// Optional JSON5 config file, every key optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    pub ollama_host: Option<String>,
    pub ollama_model: Option<String>,
    pub ollama_embed_model: Option<String>,
    pub embedding_model: Option<String>,
    pub expected_dimension: Option<usize>,
    pub service_url: Option<String>,
    pub env_file: Option<PathBuf>,
    pub helper_script: Option<PathBuf>,
    pub auto_start_server: Option<bool>,
    pub unset_hub_tokens: Option<bool>,
    pub launch_delay_secs: Option<u64>,
}

impl FileConfig {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(json5::from_str(source)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| {
            SetupError::ConfigError(format!("failed to read {}: {}", path.display(), err))
        })?;
        Self::parse(&source)
    }

    /// Explicit `AMEM_SETUP_CONFIG` must exist; the default location is optional.
    pub fn discover(env: &EnvSnapshot) -> Result<Option<Self>> {
        if let Some(explicit) = env.get(env_vars::AMEM_SETUP_CONFIG) {
            return Self::load(explicit).map(Some);
        }

        let Some(config_dir) = dirs_next::config_dir() else {
            return Ok(None);
        };

        let path = config_dir.join(defaults::CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }

        log::debug!("Loading config from {}", path.display());
        Self::load(path).map(Some)
    }
}

/// Resolved configuration handed to every component
#[derive(Debug, Clone)]
pub struct Settings {
    pub ollama_host: String,
    pub ollama_model: String,
    pub ollama_embed_model: String,
    pub embedding_model: String,
    pub expected_dimension: Option<usize>,
    pub service_url: String,
    /// Set when an API key for a hosted LLM is present
    pub hosted_backend: Option<BackendChoice>,
    /// True once `OLLAMA_HOST`, `ollamaHost` or `--ollama-host` named a server
    pub ollama_host_configured: bool,
    pub offline: bool,
    pub auto_start_server: bool,
    pub env_file: PathBuf,
    pub helper_script: PathBuf,
    pub hub_token_file: PathBuf,
    pub unset_hub_tokens: bool,
    pub probe_timeout: Duration,
    pub launch_delay: Duration,
}

impl Settings {
    /// Layering: defaults < config file < environment
    pub fn resolve(env: &EnvSnapshot, file: Option<FileConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();
        let home = home_dir(env)?;

        let pick = |var: &str, from_file: Option<String>, fallback: &str| -> String {
            env.get(var).map(str::to_string).or(from_file).unwrap_or_else(|| fallback.to_string())
        };

        let ollama_host_configured =
            env.is_set(env_vars::OLLAMA_HOST) || file.ollama_host.is_some();
        let ollama_host = normalize_base_url(&pick(
            env_vars::OLLAMA_HOST,
            file.ollama_host,
            defaults::OLLAMA_HOST,
        ));

        let offline = env.flag(env_vars::AMEM_OFFLINE)
            || env.flag(env_vars::HF_HUB_OFFLINE)
            || env.flag(env_vars::TRANSFORMERS_OFFLINE);

        Ok(Self {
            ollama_host,
            ollama_model: pick(env_vars::OLLAMA_MODEL, file.ollama_model, defaults::OLLAMA_MODEL),
            ollama_embed_model: pick(
                env_vars::OLLAMA_EMBED_MODEL,
                file.ollama_embed_model,
                defaults::OLLAMA_EMBED_MODEL,
            ),
            embedding_model: pick(
                env_vars::AMEM_EMBEDDING_MODEL,
                file.embedding_model,
                defaults::EMBEDDING_MODEL,
            ),
            expected_dimension: file.expected_dimension,
            service_url: normalize_base_url(&pick(
                env_vars::AMEM_SERVICE_URL,
                file.service_url,
                defaults::AMEM_SERVICE_URL,
            )),
            hosted_backend: hosted_backend(env),
            ollama_host_configured,
            offline,
            auto_start_server: file.auto_start_server.unwrap_or(true),
            env_file: file.env_file.unwrap_or_else(|| home.join(defaults::ENV_FILE)),
            helper_script: file.helper_script.unwrap_or_else(|| home.join(defaults::HELPER_SCRIPT)),
            hub_token_file: home.join(defaults::HUB_TOKEN_FILE),
            unset_hub_tokens: file.unset_hub_tokens.unwrap_or(true),
            probe_timeout: Duration::from_secs(defaults::PROBE_TIMEOUT_SECS),
            launch_delay: Duration::from_secs(
                file.launch_delay_secs.unwrap_or(defaults::LAUNCH_DELAY_SECS),
            ),
        })
    }

    /// Hosted keys win over a local server; without either there is no backend.
    /// Reads the layered values, so command-line overrides apply.
    pub fn backend(&self) -> BackendChoice {
        if let Some(hosted) = &self.hosted_backend {
            hosted.clone()
        } else if self.ollama_host_configured {
            BackendChoice::ollama(self.ollama_model.clone())
        } else {
            BackendChoice::none()
        }
    }
}

fn home_dir(env: &EnvSnapshot) -> Result<PathBuf> {
    env.get(env_vars::HOME)
        .map(PathBuf::from)
        .or_else(dirs_next::home_dir)
        .ok_or_else(|| SetupError::ConfigError("could not determine home directory".to_string()))
}

/// Adds a scheme when missing (`OLLAMA_HOST=127.0.0.1:11434`) and drops trailing slashes.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}
