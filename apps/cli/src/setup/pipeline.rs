use super::credentials::clear_hub_credentials;
use super::env_file::{emit_env_file, emit_helper_script, EnvTemplate};
use crate::ai::{
    default_plan, EmbeddingBackend, EnvironmentProber, ModelFetcher, ModelRegistry, ProbeReport,
    ServerLauncher,
};
use crate::config::{BackendChoice, EnvSnapshot, Settings};
use crate::error::Result;
use crate::memory::{MemoryConnector, MemoryOptions, SmokeMode, SmokeSummary, SmokeTester};
use crate::report::{Outcome, Reporter};
use crate::types::LoadedModel;

/// Flags for the combined setup flow
#[derive(Debug, Clone, Copy, Default)]
pub struct SetupOptions {
    pub clear_hub_token: bool,
    pub skip_memory_check: bool,
    pub write_helper_script: bool,
}

/// External systems the setup flow talks to
pub struct SetupDeps<'a> {
    pub registry: &'a dyn ModelRegistry,
    pub embeddings: &'a dyn EmbeddingBackend,
    pub launcher: Option<&'a dyn ServerLauncher>,
    pub connector: &'a dyn MemoryConnector,
}

#[derive(Debug, Clone)]
pub struct SetupSummary {
    /// `None` when the download was skipped because the server was down
    pub model: Option<LoadedModel>,
    pub probe: ProbeReport,
    pub smoke: Option<SmokeSummary>,
}

pub fn env_template(settings: &Settings) -> EnvTemplate {
    EnvTemplate {
        ollama_host: settings.ollama_host.clone(),
        ollama_model: settings.ollama_model.clone(),
        unset_hub_tokens: settings.unset_hub_tokens,
        path: settings.env_file.clone(),
    }
}

/// Model download and memory initialization failures end the run with
/// an error; everything else is recorded on the reporter. The download is
/// skipped with a warning when the server is still down after the liveness
/// check, so the env file is written either way.
pub async fn run_setup(
    settings: &Settings,
    env: &EnvSnapshot,
    options: SetupOptions,
    deps: &SetupDeps<'_>,
    reporter: &mut Reporter,
) -> Result<SetupSummary> {
    reporter.banner("🚀 Setting up A-mem with Ollama");

    if options.clear_hub_token {
        reporter.section("🧹 Step 0: Cleaning model hub credentials...");
        clear_hub_credentials(&settings.hub_token_file, env, reporter);
    }

    reporter.section("🔌 Step 1: Verifying Ollama...");
    let mut prober = EnvironmentProber::new(deps.registry, settings.ollama_model.clone())
        .with_timeout(settings.probe_timeout)
        .with_launch_delay(settings.launch_delay);
    if settings.auto_start_server {
        if let Some(launcher) = deps.launcher {
            prober = prober.with_launcher(launcher);
        }
    }
    let probe = prober.probe(reporter).await;

    reporter.section("📦 Step 2: Downloading embedding model...");
    reporter.detail(format!("Model: {}", settings.ollama_embed_model));
    let model = if probe.reachable {
        let plan = default_plan(&settings.ollama_embed_model, settings.offline);
        if settings.offline {
            reporter.detail("Offline mode: only cached models are tried");
        }
        match ModelFetcher::new(deps.embeddings, plan)
            .with_expected_dimension(settings.expected_dimension)
            .fetch(reporter)
            .await
        {
            Ok(model) => Some(model),
            Err(err) => {
                reporter.fail(&err);
                return Err(err);
            }
        }
    } else {
        reporter.warn(format!(
            "Skipped: Ollama is not reachable at {}, run `amem-setup fetch-model` once it is up",
            settings.ollama_host
        ));
        reporter.record(
            "embedding model",
            Outcome::Warned(format!("skipped, {} not reachable", settings.ollama_host)),
        );
        None
    };

    reporter.section("🧪 Step 3: Testing A-mem initialization...");
    let memory_options = MemoryOptions {
        embedding_model: settings.embedding_model.clone(),
        backend: BackendChoice::ollama(settings.ollama_model.clone()),
    };
    reporter.detail(format!("Initializing with {} backend...", memory_options.backend.describe()));
    let memory = match deps.connector.connect(&memory_options).await {
        Ok(memory) => {
            reporter.ok("A-mem initialized successfully with Ollama!");
            reporter.record("memory init", Outcome::Passed);
            memory
        }
        Err(err) => {
            reporter.fail(format!("Initialization failed: {}", err));
            reporter.trace(&err);
            reporter.record("memory init", Outcome::Failed(err.chain()));
            return Err(err);
        }
    };

    let smoke = if options.skip_memory_check {
        None
    } else {
        reporter.plain("");
        reporter.plain("   Running quick test...");
        let tester = SmokeTester::new(deps.connector, memory_options, SmokeMode::Quick);
        Some(tester.exercise(memory.as_ref(), reporter).await)
    };

    reporter.section("📝 Step 4: Creating environment configuration...");
    let template = env_template(settings);
    emit_env_file(&template, reporter);

    if options.write_helper_script {
        reporter.section("📝 Step 5: Creating simple test script...");
        emit_helper_script(&template, &settings.helper_script, reporter);
    }

    let summary = SetupSummary { model, probe, smoke };
    print_summary(settings, options, &summary, reporter);
    Ok(summary)
}

fn print_summary(
    settings: &Settings,
    options: SetupOptions,
    summary: &SetupSummary,
    reporter: &mut Reporter,
) {
    reporter.plain("");
    reporter.rule();
    if reporter.failures() == 0 {
        reporter.plain("✅ A-mem setup with Ollama completed!");
    } else {
        reporter.plain(format!(
            "⚠️  A-mem setup finished with {} failed step(s)",
            reporter.failures()
        ));
    }

    reporter.plain("");
    reporter.plain("What was set up:");
    match &summary.model {
        Some(model) => reporter.plain(format!(
            "  • Embedding model: {} ({} dimensions, via {})",
            model.name, model.dimension, model.strategy
        )),
        None => reporter.plain(format!(
            "  • Embedding model: {} (not downloaded yet)",
            settings.ollama_embed_model
        )),
    }
    reporter.plain("  • LLM Backend: Ollama");
    reporter.plain(format!("  • Model: {}", settings.ollama_model));
    reporter.plain(format!("  • Ollama URL: {}", settings.ollama_host));
    reporter.plain(format!("  • Environment file: {}", settings.env_file.display()));
    if options.write_helper_script {
        reporter.plain(format!("  • Test script: {}", settings.helper_script.display()));
    }

    reporter.plain("");
    reporter.plain("Next steps:");
    reporter.plain("  1. Make sure Ollama is running:");
    reporter.plain("     ollama serve");
    reporter.plain("  2. Source the environment:");
    reporter.plain(format!("     source {}", settings.env_file.display()));
    reporter.plain("  3. Run the full smoke test:");
    reporter.plain("     amem-setup smoke-test");

    if !summary.probe.reachable {
        reporter.plain("");
        reporter.plain("⚠️  NOTE: Ollama doesn't appear to be running.");
        reporter.plain("   Start it with: ollama serve");
    }

    reporter.rule();
}
