use super::launcher::ServerLauncher;
use super::ollama::{OllamaClient, TagsError};
use crate::report::{Outcome, Reporter};
use crate::types::OllamaModelInfo;

use async_trait::async_trait;
use std::time::Duration;

const STEP: &str = "inference server";
const LISTED_MODELS: usize = 5;

/// Source of the installed model list; the liveness check
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    async fn list_models(&self, timeout: Duration) -> Result<Vec<OllamaModelInfo>, TagsError>;
}

#[async_trait]
impl ModelRegistry for OllamaClient {
    async fn list_models(&self, timeout: Duration) -> Result<Vec<OllamaModelInfo>, TagsError> {
        self.tags(timeout).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub reachable: bool,
    pub model_present: bool,
    pub available_models: Vec<String>,
    pub launched_pid: Option<u32>,
}

pub struct EnvironmentProber<'a> {
    registry: &'a dyn ModelRegistry,
    launcher: Option<&'a dyn ServerLauncher>,
    required_model: String,
    timeout: Duration,
    launch_delay: Duration,
}

impl<'a> EnvironmentProber<'a> {
    pub fn new(registry: &'a dyn ModelRegistry, required_model: impl Into<String>) -> Self {
        Self {
            registry,
            launcher: None,
            required_model: required_model.into(),
            timeout: Duration::from_secs(crate::config::defaults::PROBE_TIMEOUT_SECS),
            launch_delay: Duration::from_secs(crate::config::defaults::LAUNCH_DELAY_SECS),
        }
    }

    /// Enables starting the server when the first probe cannot connect
    pub fn with_launcher(mut self, launcher: &'a dyn ServerLauncher) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    /// Never fails: every problem is reported as a warning.
    pub async fn probe(&self, reporter: &mut Reporter) -> ProbeReport {
        let mut report = ProbeReport::default();

        let outcome = match self.registry.list_models(self.timeout).await {
            Ok(models) => {
                reporter.ok("Ollama is running");
                self.inspect_models(models, &mut report, reporter)
            }
            Err(TagsError::Unreachable(reason)) => {
                log::debug!("Initial probe failed: {}", reason);
                reporter.warn("Ollama is not running");
                self.launch_and_reprobe(&mut report, reporter).await
            }
            Err(other) => {
                reporter.warn(format!("Ollama {}", other));
                Outcome::Warned(other.to_string())
            }
        };

        reporter.record(STEP, outcome);
        report
    }

    fn inspect_models(
        &self,
        models: Vec<OllamaModelInfo>,
        report: &mut ProbeReport,
        reporter: &mut Reporter,
    ) -> Outcome {
        report.reachable = true;
        report.available_models = models.into_iter().map(|model| model.name).collect();
        report.model_present =
            report.available_models.iter().any(|name| name.contains(&self.required_model));

        if report.model_present {
            reporter.ok(format!("{} model is available", self.required_model));
            return Outcome::Passed;
        }

        let listed: Vec<&str> =
            report.available_models.iter().take(LISTED_MODELS).map(String::as_str).collect();
        reporter.warn(format!("{} not found", self.required_model));
        reporter.detail(format!("Available models: {:?}", listed));
        reporter.detail(format!("Pull it with: ollama pull {}", self.required_model));
        Outcome::Warned(format!("model {} is not installed", self.required_model))
    }

    async fn launch_and_reprobe(
        &self,
        report: &mut ProbeReport,
        reporter: &mut Reporter,
    ) -> Outcome {
        let Some(launcher) = self.launcher else {
            reporter.detail("Please run 'ollama serve' in another terminal");
            reporter.detail("Continuing anyway...");
            return Outcome::Warned("server not running".to_string());
        };

        reporter.detail("Starting Ollama in background...");
        match launcher.launch() {
            Ok(pid) => report.launched_pid = Some(pid),
            Err(err) => {
                reporter.fail(format!("Failed to start Ollama: {}", err));
                reporter.detail("Please run 'ollama serve' manually in another terminal");
                return Outcome::Warned(err.to_string());
            }
        }

        reporter.detail("Waiting for Ollama to start...");
        tokio::time::sleep(self.launch_delay).await;

        match self.registry.list_models(self.timeout).await {
            Ok(models) => {
                reporter.ok("Ollama started successfully");
                self.inspect_models(models, report, reporter)
            }
            Err(err) => {
                reporter.fail("Ollama failed to start properly");
                reporter.detail(format!("Last probe: {}", err));
                Outcome::Warned(format!("server started but {}", err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SetupError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedRegistry {
        responses: Mutex<Vec<std::result::Result<Vec<OllamaModelInfo>, TagsError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedRegistry {
        fn new(mut responses: Vec<std::result::Result<Vec<OllamaModelInfo>, TagsError>>) -> Self {
            responses.reverse();
            Self { responses: Mutex::new(responses), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl ModelRegistry for ScriptedRegistry {
        async fn list_models(
            &self,
            _timeout: Duration,
        ) -> std::result::Result<Vec<OllamaModelInfo>, TagsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .expect("lock")
                .pop()
                .unwrap_or_else(|| Err(TagsError::Unreachable("exhausted".into())))
        }
    }

    struct CountingLauncher {
        launches: AtomicUsize,
        fail: bool,
    }

    impl ServerLauncher for CountingLauncher {
        fn launch(&self) -> Result<u32> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SetupError::LaunchError("no binary".into()))
            } else {
                Ok(4242)
            }
        }
    }

    fn models(names: &[&str]) -> Vec<OllamaModelInfo> {
        names.iter().map(|name| OllamaModelInfo::named(*name)).collect()
    }

    #[tokio::test]
    async fn present_model_passes() {
        let registry = ScriptedRegistry::new(vec![Ok(models(&["llama3.2:latest"]))]);
        let mut reporter = Reporter::quiet();

        let report = EnvironmentProber::new(&registry, "llama3.2").probe(&mut reporter).await;

        assert!(report.reachable && report.model_present);
        assert_eq!(reporter.steps()[0].outcome, Outcome::Passed);
    }

    #[tokio::test]
    async fn missing_model_is_a_warning() {
        let registry = ScriptedRegistry::new(vec![Ok(models(&["mistral:latest", "qwen3:4b"]))]);
        let mut reporter = Reporter::quiet();

        let report = EnvironmentProber::new(&registry, "llama3.2").probe(&mut reporter).await;

        assert!(report.reachable);
        assert!(!report.model_present);
        assert!(matches!(reporter.steps()[0].outcome, Outcome::Warned(_)));
        assert_eq!(reporter.exit_code(), 0);
        assert!(reporter.lines().iter().any(|line| line.contains("mistral:latest")));
    }

    #[tokio::test]
    async fn unreachable_server_is_launched_and_reprobed_once() {
        let registry = ScriptedRegistry::new(vec![
            Err(TagsError::Unreachable("connection refused".into())),
            Ok(models(&["llama3.2:latest"])),
        ]);
        let launcher = CountingLauncher { launches: AtomicUsize::new(0), fail: false };
        let mut reporter = Reporter::quiet();

        let report = EnvironmentProber::new(&registry, "llama3.2")
            .with_launcher(&launcher)
            .with_launch_delay(Duration::ZERO)
            .probe(&mut reporter)
            .await;

        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert_eq!(registry.calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.launched_pid, Some(4242));
        assert!(report.model_present);
    }

    #[tokio::test]
    async fn failed_reprobe_is_not_fatal() {
        let registry = ScriptedRegistry::new(vec![
            Err(TagsError::Unreachable("connection refused".into())),
            Err(TagsError::Unreachable("still refused".into())),
        ]);
        let launcher = CountingLauncher { launches: AtomicUsize::new(0), fail: false };
        let mut reporter = Reporter::quiet();

        let report = EnvironmentProber::new(&registry, "llama3.2")
            .with_launcher(&launcher)
            .with_launch_delay(Duration::ZERO)
            .probe(&mut reporter)
            .await;

        assert!(!report.reachable);
        assert_eq!(registry.calls.load(Ordering::SeqCst), 2);
        assert_eq!(reporter.exit_code(), 0);
    }

    #[tokio::test]
    async fn launch_failure_skips_reprobe() {
        let registry =
            ScriptedRegistry::new(vec![Err(TagsError::Unreachable("connection refused".into()))]);
        let launcher = CountingLauncher { launches: AtomicUsize::new(0), fail: true };
        let mut reporter = Reporter::quiet();

        EnvironmentProber::new(&registry, "llama3.2")
            .with_launcher(&launcher)
            .with_launch_delay(Duration::ZERO)
            .probe(&mut reporter)
            .await;

        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(reporter.steps()[0].outcome, Outcome::Warned(_)));
    }

    #[tokio::test]
    async fn unexpected_status_does_not_launch() {
        let registry = ScriptedRegistry::new(vec![Err(TagsError::UnexpectedStatus(500))]);
        let launcher = CountingLauncher { launches: AtomicUsize::new(0), fail: false };
        let mut reporter = Reporter::quiet();

        let report = EnvironmentProber::new(&registry, "llama3.2")
            .with_launcher(&launcher)
            .probe(&mut reporter)
            .await;

        assert!(!report.reachable);
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_the_launch_delay_before_reprobing() {
        let registry = ScriptedRegistry::new(vec![
            Err(TagsError::Unreachable("connection refused".into())),
            Ok(models(&["llama3.2"])),
        ]);
        let launcher = CountingLauncher { launches: AtomicUsize::new(0), fail: false };
        let mut reporter = Reporter::quiet();
        let started = tokio::time::Instant::now();

        EnvironmentProber::new(&registry, "llama3.2")
            .with_launcher(&launcher)
            .with_launch_delay(Duration::from_secs(3))
            .probe(&mut reporter)
            .await;

        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
