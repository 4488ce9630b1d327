use crate::ai::{default_plan, EnvironmentProber, ModelFetcher, ProbeReport};
use crate::error::Result;
use crate::report::Reporter;
use crate::state::AppState;
use crate::types::LoadedModel;

pub async fn probe(state: &AppState, reporter: &mut Reporter) -> ProbeReport {
    let settings = state.settings();
    reporter.banner("🔌 Checking Ollama");
    reporter.detail(format!("URL: {}", settings.ollama_host));

    let mut prober = EnvironmentProber::new(state.ollama(), settings.ollama_model.clone())
        .with_timeout(settings.probe_timeout)
        .with_launch_delay(settings.launch_delay);
    if let Some(launcher) = state.launcher() {
        prober = prober.with_launcher(launcher);
    }

    prober.probe(reporter).await
}

pub async fn fetch_model(state: &AppState, reporter: &mut Reporter) -> Result<LoadedModel> {
    let settings = state.settings();
    reporter.banner("📦 Downloading embedding model");
    reporter.detail(format!("Model: {}", settings.ollama_embed_model));
    if settings.offline {
        reporter.detail("Offline mode: only cached models are tried");
    }

    let plan = default_plan(&settings.ollama_embed_model, settings.offline);
    let result = ModelFetcher::new(state.ollama(), plan)
        .with_expected_dimension(settings.expected_dimension)
        .fetch(reporter)
        .await;

    match &result {
        Ok(model) => reporter.ok(format!("{} is ready ({})", model.name, model.strategy)),
        Err(err) => reporter.fail(err),
    }

    result
}
