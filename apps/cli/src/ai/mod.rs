pub mod launcher;
pub mod model_fetch;
pub mod ollama;
pub mod probe;

pub use crate::types::{LoadedModel, OllamaModelInfo};
pub use launcher::{detect_system_ollama, OllamaLauncher, ServerLauncher};
pub use model_fetch::{default_plan, name_variants, EmbeddingBackend, FetchAttempt, LoadPath, ModelFetcher};
pub use ollama::{OllamaClient, TagsError};
pub use probe::{EnvironmentProber, ModelRegistry, ProbeReport};
