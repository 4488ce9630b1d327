use crate::ai::{OllamaClient, OllamaLauncher, ServerLauncher};
use crate::config::{EnvSnapshot, Settings};
use crate::error::Result;
use crate::memory::{AmemServiceConnector, MemoryOptions};
use crate::setup::{SetupDeps, SetupOptions};

/// Resolved settings plus the production clients built from them
pub struct AppState {
    settings: Settings,
    env: EnvSnapshot,
    ollama: OllamaClient,
    launcher: OllamaLauncher,
    connector: AmemServiceConnector,
}

impl AppState {
    pub fn new(settings: Settings, env: EnvSnapshot) -> Result<Self> {
        let ollama = OllamaClient::new(settings.ollama_host.clone())?;
        let launcher = OllamaLauncher::for_endpoint(&settings.ollama_host);
        let connector = AmemServiceConnector::new(settings.service_url.clone());

        log::debug!(
            "Using Ollama at {}, A-mem service at {}",
            settings.ollama_host,
            settings.service_url
        );

        Ok(Self { settings, env, ollama, launcher, connector })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ollama(&self) -> &OllamaClient {
        &self.ollama
    }

    pub fn connector(&self) -> &AmemServiceConnector {
        &self.connector
    }

    /// `None` when automatic server start is disabled
    pub fn launcher(&self) -> Option<&dyn ServerLauncher> {
        if self.settings.auto_start_server {
            Some(&self.launcher as &dyn ServerLauncher)
        } else {
            None
        }
    }

    /// Backend resolved from the fully layered settings
    pub fn memory_options(&self) -> MemoryOptions {
        MemoryOptions {
            embedding_model: self.settings.embedding_model.clone(),
            backend: self.settings.backend(),
        }
    }

    /// Settings, environment and clients for one setup run. Requesting
    /// credential cleanup also keeps the hub tokens away from a launched server.
    pub fn setup_parts(&mut self, options: SetupOptions) -> (&Settings, &EnvSnapshot, SetupDeps<'_>) {
        if options.clear_hub_token {
            self.launcher.withhold_hub_tokens();
        }

        let deps = SetupDeps {
            registry: &self.ollama,
            embeddings: &self.ollama,
            launcher: if self.settings.auto_start_server {
                Some(&self.launcher as &dyn ServerLauncher)
            } else {
                None
            },
            connector: &self.connector,
        };
        (&self.settings, &self.env, deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::config::LlmBackend;
    use clap::Parser;

    fn state_for(pairs: &[(&str, &str)], args: &[&str]) -> AppState {
        let env = EnvSnapshot::from_pairs(pairs.iter().copied());
        let mut settings = Settings::resolve(&env, None).expect("settings");
        Cli::try_parse_from(args).expect("parse").apply(&mut settings);
        AppState::new(settings, env).expect("state")
    }

    #[test]
    fn model_flag_reaches_the_memory_backend() {
        let state = state_for(
            &[("HOME", "/home/dev"), ("OLLAMA_HOST", "http://localhost:11434")],
            &["amem-setup", "smoke-test", "--model", "mistral"],
        );
        let options = state.memory_options();
        assert_eq!(options.backend.backend, Some(LlmBackend::Ollama));
        assert_eq!(options.backend.model.as_deref(), Some("mistral"));
    }

    #[test]
    fn host_flag_alone_selects_ollama() {
        let state = state_for(
            &[("HOME", "/home/dev")],
            &["amem-setup", "smoke-test", "--ollama-host", "127.0.0.1:11500"],
        );
        assert_eq!(state.memory_options().backend.describe(), "Ollama (llama3.2)");

        let state = state_for(&[("HOME", "/home/dev")], &["amem-setup", "smoke-test"]);
        assert_eq!(state.memory_options().backend.backend, None);
    }

    #[test]
    fn credential_cleanup_withholds_tokens_from_the_launcher() {
        let mut state = state_for(&[("HOME", "/home/dev")], &["amem-setup"]);
        state.setup_parts(SetupOptions::default());
        assert!(state.launcher.withheld_env().is_empty());

        let options = SetupOptions { clear_hub_token: true, ..SetupOptions::default() };
        state.setup_parts(options);
        assert_eq!(state.launcher.withheld_env(), ["HF_TOKEN", "HUGGINGFACE_TOKEN", "HF_API_TOKEN"]);
    }
}
