//! Command line arguments.

use crate::config::{normalize_base_url, Settings};
use crate::setup::SetupOptions;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Prepares a workstation to run the A-mem memory library against a local Ollama
#[derive(Parser, Debug)]
#[command(name = "amem-setup", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Ollama base URL
    #[arg(long, global = true, value_name = "URL")]
    pub ollama_host: Option<String>,

    /// Completion model that must be installed in Ollama
    #[arg(long, global = true, value_name = "NAME")]
    pub model: Option<String>,

    /// Embedding model pulled and smoke-checked through Ollama
    #[arg(long, global = true, value_name = "NAME")]
    pub embed_model: Option<String>,

    /// A-mem service base URL
    #[arg(long, global = true, value_name = "URL")]
    pub service_url: Option<String>,

    /// Where the shell env file is written
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Never start `ollama serve` automatically
    #[arg(long, global = true)]
    pub no_auto_start: bool,

    /// Leave hub token variables out of the generated files
    #[arg(long, global = true)]
    pub no_unset_tokens: bool,

    /// Only use models already present locally
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Full setup: model, server, memory check, env file
    Setup {
        /// Delete the stored model hub token first
        #[arg(long)]
        clear_hub_token: bool,

        /// Stop after initializing the memory system
        #[arg(long)]
        skip_memory_check: bool,

        /// Also write the quick-test shell script
        #[arg(long)]
        helper_script: bool,

        /// Path for the quick-test shell script
        #[arg(long, value_name = "PATH", requires = "helper_script")]
        helper_script_path: Option<PathBuf>,
    },

    /// Exercise the memory system with sample notes and queries
    SmokeTest {
        /// One note and one query instead of the full run
        #[arg(long)]
        quick: bool,
    },

    /// Check that Ollama is up and the completion model is installed
    Probe,

    /// Download and smoke-check the embedding model
    FetchModel,

    /// Write the shell env file only
    WriteEnv,
}

impl Default for Command {
    fn default() -> Self {
        Command::Setup {
            clear_hub_token: false,
            skip_memory_check: false,
            helper_script: false,
            helper_script_path: None,
        }
    }
}

impl Command {
    pub fn setup_options(&self) -> SetupOptions {
        match self {
            Command::Setup { clear_hub_token, skip_memory_check, helper_script, .. } => {
                SetupOptions {
                    clear_hub_token: *clear_hub_token,
                    skip_memory_check: *skip_memory_check,
                    write_helper_script: *helper_script,
                }
            }
            _ => SetupOptions::default(),
        }
    }
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }

    /// Flags win over environment and config file
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(host) = &self.ollama_host {
            settings.ollama_host = normalize_base_url(host);
            settings.ollama_host_configured = true;
        }
        if let Some(model) = &self.model {
            settings.ollama_model = model.clone();
        }
        if let Some(model) = &self.embed_model {
            settings.ollama_embed_model = model.clone();
        }
        if let Some(url) = &self.service_url {
            settings.service_url = normalize_base_url(url);
        }
        if let Some(path) = &self.env_file {
            settings.env_file = path.clone();
        }
        if self.no_auto_start {
            settings.auto_start_server = false;
        }
        if self.no_unset_tokens {
            settings.unset_hub_tokens = false;
        }
        if self.offline {
            settings.offline = true;
        }
        if let Some(Command::Setup { helper_script_path: Some(path), .. }) = &self.command {
            settings.helper_script = path.clone();
        }
    }
}
