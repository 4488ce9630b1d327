use crate::config::env_vars;
use crate::error::Result;
use crate::report::{Outcome, Reporter};

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Inputs for the shell env file and the helper script
#[derive(Debug, Clone)]
pub struct EnvTemplate {
    pub ollama_host: String,
    pub ollama_model: String,
    pub unset_hub_tokens: bool,
    pub path: PathBuf,
}

impl EnvTemplate {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("# A-mem Configuration with Ollama\n");
        out.push_str(&format!("# Generated by amem-setup on {}\n", generated_at()));
        out.push_str(&export_line("OLLAMA_HOST", &self.ollama_host));
        out.push_str(&export_line("OLLAMA_MODEL", &self.ollama_model));

        if self.unset_hub_tokens {
            out.push_str("\n# Clear any HuggingFace authentication issues\n");
            for var in env_vars::HUB_TOKENS {
                out.push_str(&format!("unset {}\n", var));
            }
        }

        out.push_str("\n# To use these settings, run:\n");
        out.push_str(&format!("# source {}\n", self.path.display()));
        out
    }

    /// Shell wrapper that loads the same settings and runs the quick smoke test
    pub fn render_helper_script(&self) -> String {
        let mut out = String::from("#!/usr/bin/env sh\n");
        out.push_str("# Quick A-mem check generated by amem-setup\n");
        out.push_str("set -e\n\n");
        out.push_str(&export_line("OLLAMA_HOST", &self.ollama_host));
        out.push_str(&export_line("OLLAMA_MODEL", &self.ollama_model));
        out.push_str(&export_line(env_vars::HF_HUB_DISABLE_IMPLICIT_TOKEN, "1"));
        for var in env_vars::HUB_TOKENS {
            out.push_str(&format!("unset {}\n", var));
        }
        out.push_str("\nexec amem-setup smoke-test --quick \"$@\"\n");
        out
    }
}

/// `export NAME="value"` with the value escaped for double quotes
pub fn export_line(name: &str, value: &str) -> String {
    format!("export {}=\"{}\"\n", name, escape_double_quoted(value))
}

fn escape_double_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn generated_at() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Writes `contents`, creating parent directories; `mode` applies on Unix only
pub fn write_file(path: &Path, contents: &str, mode: Option<u32>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = mode {
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(mode);
            fs::set_permissions(path, perms)?;
        }
    }

    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}

/// Never fatal: a write failure is reported as a warning.
pub fn emit_env_file(template: &EnvTemplate, reporter: &mut Reporter) -> Outcome {
    let outcome = match write_file(&template.path, &template.render(), None) {
        Ok(()) => {
            reporter.ok(format!("Configuration saved to: {}", template.path.display()));
            reporter.detail(format!("Run: source {}", template.path.display()));
            Outcome::Passed
        }
        Err(err) => {
            reporter.warn(format!("Could not create env file: {}", err));
            Outcome::Warned(err.to_string())
        }
    };

    reporter.record("env file", outcome.clone());
    outcome
}

pub fn emit_helper_script(template: &EnvTemplate, path: &Path, reporter: &mut Reporter) -> Outcome {
    let outcome = match write_file(path, &template.render_helper_script(), Some(0o755)) {
        Ok(()) => {
            reporter.ok(format!("Test script saved to: {}", path.display()));
            Outcome::Passed
        }
        Err(err) => {
            reporter.warn(format!("Could not create test script: {}", err));
            Outcome::Warned(err.to_string())
        }
    };

    reporter.record("helper script", outcome.clone());
    outcome
}
