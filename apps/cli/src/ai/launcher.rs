use crate::config::env_vars;
use crate::error::{Result, SetupError};

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Starts a local inference server in the background
pub trait ServerLauncher: Send + Sync {
    /// Returns the PID of the detached process
    fn launch(&self) -> Result<u32>;
}

/// Spawns `ollama serve` detached from this process
pub struct OllamaLauncher {
    binary_path: Option<PathBuf>,
    bind_address: Option<String>,
    /// Variables the server must not inherit from this process
    withheld_env: Vec<&'static str>,
}

impl OllamaLauncher {
    /// Binds to the host:port of `endpoint` when it is not the Ollama default
    pub fn for_endpoint(endpoint: &str) -> Self {
        Self {
            binary_path: detect_system_ollama(),
            bind_address: bind_address(endpoint),
            withheld_env: Vec::new(),
        }
    }

    /// Starts the server without the hub token variables in its environment
    pub fn withhold_hub_tokens(&mut self) {
        self.withheld_env = env_vars::HUB_TOKENS.to_vec();
    }

    pub fn withheld_env(&self) -> &[&'static str] {
        &self.withheld_env
    }

    pub fn with_binary(mut self, path: PathBuf) -> Self {
        self.binary_path = Some(path);
        self
    }

    pub fn binary_path(&self) -> Option<&Path> {
        self.binary_path.as_deref()
    }
}

impl OllamaLauncher {
    fn serve_command(&self, binary: &Path) -> Command {
        let mut cmd = Command::new(binary);
        cmd.arg("serve").stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

        if let Some(address) = &self.bind_address {
            cmd.env(env_vars::OLLAMA_HOST, address);
        }
        for var in &self.withheld_env {
            cmd.env_remove(var);
        }

        // Own process group so Ctrl-C on this tool leaves the server running
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd
    }
}

impl ServerLauncher for OllamaLauncher {
    fn launch(&self) -> Result<u32> {
        let binary = self.binary_path.as_ref().ok_or_else(|| {
            SetupError::LaunchError(
                "ollama binary not found; install it from https://ollama.com".to_string(),
            )
        })?;

        let mut cmd = self.serve_command(binary);
        let child = cmd
            .spawn()
            .map_err(|err| SetupError::LaunchError(format!("{}: {}", binary.display(), err)))?;

        let pid = child.id();
        log::info!("Started {} serve with PID: {}", binary.display(), pid);
        Ok(pid)
    }
}

/// Detect if system Ollama is available
pub fn detect_system_ollama() -> Option<PathBuf> {
    let candidates = if cfg!(target_os = "macos") {
        vec![
            "/usr/local/bin/ollama",
            "/opt/homebrew/bin/ollama",
            "/Applications/Ollama.app/Contents/MacOS/ollama",
        ]
    } else if cfg!(target_os = "linux") {
        vec!["/usr/local/bin/ollama", "/usr/bin/ollama", "/snap/bin/ollama"]
    } else if cfg!(target_os = "windows") {
        vec![r"C:\Program Files\Ollama\ollama.exe", r"C:\Program Files (x86)\Ollama\ollama.exe"]
    } else {
        vec![]
    };

    for path_str in candidates {
        let path = PathBuf::from(path_str);
        if path.exists() {
            return Some(path);
        }
    }

    which::which("ollama").ok()
}

fn bind_address(endpoint: &str) -> Option<String> {
    let authority = endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/');

    match authority {
        "" | "localhost:11434" | "127.0.0.1:11434" => None,
        other => Some(other.to_string()),
    }
}
