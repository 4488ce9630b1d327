pub mod samples;
pub mod service;
pub mod smoke;

use crate::config::BackendChoice;
use crate::error::Result;

use async_trait::async_trait;
use rust_shared::NoteRecord;

pub use service::{AmemServiceClient, AmemServiceConnector};
pub use smoke::{SmokeMode, SmokeSummary, SmokeTester};

/// Constructor arguments for a memory system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOptions {
    pub embedding_model: String,
    pub backend: BackendChoice,
}

/// The agentic memory surface exercised by the smoke test
#[async_trait]
pub trait MemorySystem: Send + Sync {
    /// Returns the new note's identifier
    async fn add_note(&self, content: &str, tags: &[String]) -> Result<String>;

    /// Ordered results; order and content are owned by the memory system
    async fn search_agentic(&self, query: &str, k: usize) -> Result<Vec<NoteRecord>>;

    async fn read(&self, id: &str) -> Result<NoteRecord>;
}

/// Builds a ready-to-use memory system; failure here is fatal
#[async_trait]
pub trait MemoryConnector: Send + Sync {
    async fn connect(&self, options: &MemoryOptions) -> Result<Box<dyn MemorySystem>>;
}
