use super::ollama::OllamaClient;
use crate::error::{Result, SetupError};
use crate::report::{Outcome, Reporter};
use crate::types::LoadedModel;

use async_trait::async_trait;
use std::fmt;

const STEP: &str = "embedding model";
const SMOKE_INPUT: &str = "test sentence";
const DEFAULT_NAMESPACE: &str = "library";

/// Model-loading facility behind the fetch strategies
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Download the model into the backend's cache
    async fn pull(&self, model: &str) -> Result<()>;
    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[async_trait]
impl EmbeddingBackend for OllamaClient {
    async fn pull(&self, model: &str) -> Result<()> {
        self.pull_model(model).await
    }

    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        OllamaClient::embed(self, model, inputs).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPath {
    /// Download first, then run the smoke pass
    Pull,
    /// Smoke pass only, against whatever the backend already holds
    Cached,
}

impl fmt::Display for LoadPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPath::Pull => f.write_str("pull"),
            LoadPath::Cached => f.write_str("cached"),
        }
    }
}

/// One named strategy in the fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub path: LoadPath,
    pub model: String,
}

impl FetchAttempt {
    pub fn new(path: LoadPath, model: impl Into<String>) -> Self {
        Self { path, model: model.into() }
    }

    pub fn label(&self) -> String {
        format!("{}:{}", self.path, self.model)
    }
}

/// The requested name plus the same name with its namespace prefix toggled
pub fn name_variants(model: &str) -> Vec<String> {
    let model = model.trim();
    let alternate = match model.rsplit_once('/') {
        Some((_, bare)) if !bare.is_empty() => bare.to_string(),
        _ => format!("{}/{}", DEFAULT_NAMESPACE, model),
    };

    if alternate == model {
        vec![model.to_string()]
    } else {
        vec![model.to_string(), alternate]
    }
}

/// Offline runs only try what is already cached.
pub fn default_plan(model: &str, offline: bool) -> Vec<FetchAttempt> {
    let variants = name_variants(model);

    if offline {
        return variants.into_iter().map(|name| FetchAttempt::new(LoadPath::Cached, name)).collect();
    }

    let mut plan: Vec<FetchAttempt> =
        variants.iter().map(|name| FetchAttempt::new(LoadPath::Pull, name.clone())).collect();
    plan.push(FetchAttempt::new(LoadPath::Cached, variants[0].clone()));
    plan
}

pub struct ModelFetcher<'a> {
    backend: &'a dyn EmbeddingBackend,
    plan: Vec<FetchAttempt>,
    expected_dimension: Option<usize>,
}

impl<'a> ModelFetcher<'a> {
    pub fn new(backend: &'a dyn EmbeddingBackend, plan: Vec<FetchAttempt>) -> Self {
        Self { backend, plan, expected_dimension: None }
    }

    pub fn with_expected_dimension(mut self, dimension: Option<usize>) -> Self {
        self.expected_dimension = dimension;
        self
    }

    pub fn plan(&self) -> &[FetchAttempt] {
        &self.plan
    }

    /// Tries each attempt in order and stops at the first success.
    pub async fn fetch(&self, reporter: &mut Reporter) -> Result<LoadedModel> {
        let mut last_error = None;

        for attempt in &self.plan {
            let label = attempt.label();
            reporter.detail(format!("Trying {}...", label));

            match self.try_attempt(attempt).await {
                Ok(dimension) => {
                    reporter.ok(format!("Model working (embedding dimension: {})", dimension));
                    reporter.record(STEP, Outcome::Passed);
                    return Ok(LoadedModel {
                        name: attempt.model.clone(),
                        strategy: attempt.path.to_string(),
                        dimension,
                    });
                }
                Err(err) => {
                    reporter.fail(format!("Failed with {}: {}", label, err.chain()));
                    last_error = Some(err);
                }
            }
        }

        reporter.detail("Note: You may need to:");
        reporter.detail("   1. Check your internet connection");
        reporter.detail("   2. Make sure the inference server is running: ollama serve");
        reporter.detail("   3. Try again");

        let last_error = last_error.unwrap_or_else(|| {
            SetupError::InvalidInput("no fetch strategies configured".to_string())
        });
        let error = SetupError::ModelUnavailable {
            attempts: self.plan.len(),
            last_error: Box::new(last_error),
        };
        reporter.record(STEP, Outcome::Failed(error.chain()));
        Err(error)
    }

    async fn try_attempt(&self, attempt: &FetchAttempt) -> Result<usize> {
        if attempt.path == LoadPath::Pull {
            log::info!("Downloading {} (this may take a minute)", attempt.model);
            self.backend.pull(&attempt.model).await?;
        }

        self.smoke_check(&attempt.model).await
    }

    /// Embeds the same sentence twice; both vectors must share one non-zero length.
    async fn smoke_check(&self, model: &str) -> Result<usize> {
        let inputs = vec![SMOKE_INPUT.to_string(), SMOKE_INPUT.to_string()];
        let vectors = self.backend.embed(model, &inputs).await?;

        if vectors.len() != inputs.len() {
            return Err(SetupError::SmokeCheckFailed(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                vectors.len()
            )));
        }

        let dimension = vectors[0].len();
        if dimension == 0 {
            return Err(SetupError::SmokeCheckFailed("empty embedding".to_string()));
        }

        if vectors.iter().any(|vector| vector.len() != dimension) {
            return Err(SetupError::SmokeCheckFailed(
                "embedding length is not stable across calls".to_string(),
            ));
        }

        if let Some(expected) = self.expected_dimension {
            if expected != dimension {
                return Err(SetupError::SmokeCheckFailed(format!(
                    "expected dimension {}, got {}",
                    expected, dimension
                )));
            }
        }

        Ok(dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Pulls succeed only for `pullable`; embeds only for `servable`.
    struct FakeBackend {
        pullable: HashSet<String>,
        servable: HashSet<String>,
        dimension: usize,
        calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(pullable: &[&str], servable: &[&str]) -> Self {
            Self {
                pullable: pullable.iter().map(|name| name.to_string()).collect(),
                servable: servable.iter().map(|name| name.to_string()).collect(),
                dimension: 384,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl EmbeddingBackend for FakeBackend {
        async fn pull(&self, model: &str) -> Result<()> {
            self.calls.lock().expect("lock").push(format!("pull:{}", model));
            if self.pullable.contains(model) {
                Ok(())
            } else {
                Err(SetupError::OllamaError(format!("pull model manifest: {} not found", model)))
            }
        }

        async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.lock().expect("lock").push(format!("embed:{}", model));
            if self.servable.contains(model) {
                Ok(inputs.iter().map(|_| vec![0.1; self.dimension]).collect())
            } else {
                Err(SetupError::OllamaError(format!("model \"{}\" not found", model)))
            }
        }
    }

    #[test]
    fn variants_toggle_namespace() {
        assert_eq!(
            name_variants("sentence-transformers/all-MiniLM-L6-v2"),
            ["sentence-transformers/all-MiniLM-L6-v2", "all-MiniLM-L6-v2"]
        );
        assert_eq!(name_variants("all-minilm"), ["all-minilm", "library/all-minilm"]);
    }

    #[test]
    fn online_plan_pulls_both_variants_then_tries_cache() {
        let labels: Vec<String> =
            default_plan("all-minilm", false).iter().map(FetchAttempt::label).collect();
        assert_eq!(labels, ["pull:all-minilm", "pull:library/all-minilm", "cached:all-minilm"]);
    }

    #[test]
    fn offline_plan_never_pulls() {
        let plan = default_plan("all-minilm", true);
        assert!(plan.iter().all(|attempt| attempt.path == LoadPath::Cached));
        assert_eq!(plan.len(), 2);
    }

    #[tokio::test]
    async fn primary_success_stops_the_chain() {
        let backend = FakeBackend::new(&["all-minilm"], &["all-minilm"]);
        let mut reporter = Reporter::quiet();

        let loaded = ModelFetcher::new(&backend, default_plan("all-minilm", false))
            .fetch(&mut reporter)
            .await
            .expect("model");

        assert_eq!(loaded.dimension, 384);
        assert_eq!(loaded.strategy, "pull");
        assert_eq!(backend.calls(), ["pull:all-minilm", "embed:all-minilm"]);
    }

    #[tokio::test]
    async fn primary_failure_falls_back_to_alternate() {
        let backend = FakeBackend::new(&["library/all-minilm"], &["library/all-minilm"]);
        let mut reporter = Reporter::quiet();

        let loaded = ModelFetcher::new(&backend, default_plan("all-minilm", false))
            .fetch(&mut reporter)
            .await
            .expect("fallback model");

        assert_eq!(loaded.name, "library/all-minilm");
        assert_eq!(backend.calls()[0], "pull:all-minilm");
        assert_eq!(reporter.exit_code(), 0);
    }

    #[tokio::test]
    async fn all_strategies_failing_is_fatal() {
        let backend = FakeBackend::new(&[], &[]);
        let mut reporter = Reporter::quiet();

        let err = ModelFetcher::new(&backend, default_plan("all-minilm", false))
            .fetch(&mut reporter)
            .await
            .expect_err("no strategy can succeed");

        assert!(matches!(err, SetupError::ModelUnavailable { attempts: 3, .. }));
        assert!(err.is_fatal());
        assert_eq!(reporter.exit_code(), 1);
        assert_eq!(
            backend.calls(),
            ["pull:all-minilm", "pull:library/all-minilm", "embed:all-minilm"]
        );
    }

    #[tokio::test]
    async fn dimension_mismatch_moves_to_next_attempt() {
        let backend = FakeBackend::new(&["all-minilm"], &["all-minilm"]);
        let mut reporter = Reporter::quiet();

        let err = ModelFetcher::new(&backend, vec![FetchAttempt::new(LoadPath::Cached, "all-minilm")])
            .with_expected_dimension(Some(768))
            .fetch(&mut reporter)
            .await
            .expect_err("dimension must match");

        assert!(err.to_string().contains("expected dimension 768, got 384"));
    }
}
