use super::{MemoryConnector, MemoryOptions, MemorySystem};
use crate::error::{Result, SetupError};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use rust_shared::{AddNoteRequest, AddNoteResponse, HealthResponse, NoteRecord, SearchResponse};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the A-mem indexing service
pub struct AmemServiceClient {
    endpoint: String,
    http: Client,
    options: MemoryOptions,
}

impl AmemServiceClient {
    pub fn new(endpoint: impl Into<String>, options: MemoryOptions) -> Result<Self> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self { endpoint: endpoint.into().trim_end_matches('/').to_string(), http, options })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn options(&self) -> &MemoryOptions {
        &self.options
    }

    /// `{endpoint}/amem/memory/{id}` with the id escaped as one path segment
    fn note_url(&self, id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|err| SetupError::InvalidInput(format!("{}: {}", self.endpoint, err)))?;
        url.path_segments_mut()
            .map_err(|_| SetupError::InvalidInput(format!("{} cannot take a path", self.endpoint)))?
            .pop_if_empty()
            .extend(["amem", "memory", id]);
        Ok(url)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.endpoint);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SetupError::HttpError(format!(
                "health check returned {}: {}",
                status,
                body.trim()
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MemorySystem for AmemServiceClient {
    async fn add_note(&self, content: &str, tags: &[String]) -> Result<String> {
        let url = format!("{}/amem/add", self.endpoint);
        let request = AddNoteRequest {
            content: content.to_string(),
            context: None,
            tags: Some(tags.to_vec()),
            category: None,
            embedding_model: Some(self.options.embedding_model.clone()),
            llm_backend: self.options.backend.backend.map(|backend| backend.as_str().to_string()),
            llm_model: self.options.backend.model.clone(),
        };

        let response = self.http.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SetupError::MemoryError(format!(
                "add_note returned {}: {}",
                status,
                body.trim()
            )));
        }

        let payload: AddNoteResponse = response.json().await?;
        Ok(payload.memory_id)
    }

    async fn search_agentic(&self, query: &str, k: usize) -> Result<Vec<NoteRecord>> {
        let url = format!("{}/amem/search", self.endpoint);
        let response = self
            .http
            .get(&url)
            .query(&[("q", query.to_string()), ("k", k.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SetupError::MemoryError(format!(
                "search_agentic returned {}: {}",
                status,
                body.trim()
            )));
        }

        let payload: SearchResponse = response.json().await?;
        Ok(payload.memories)
    }

    async fn read(&self, id: &str) -> Result<NoteRecord> {
        let response = self.http.get(self.note_url(id)?).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SetupError::NoteNotFound(id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SetupError::MemoryError(format!(
                "read returned {}: {}",
                status,
                body.trim()
            )));
        }

        Ok(response.json().await?)
    }
}

/// Connects to the service and requires a healthy `/health` before use
pub struct AmemServiceConnector {
    endpoint: String,
}

impl AmemServiceConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }
}

#[async_trait]
impl MemoryConnector for AmemServiceConnector {
    async fn connect(&self, options: &MemoryOptions) -> Result<Box<dyn MemorySystem>> {
        let client = AmemServiceClient::new(self.endpoint.clone(), options.clone())
            .map_err(|err| SetupError::MemoryInitError(err.chain()))?;

        let health = client.health().await.map_err(|err| SetupError::ServiceUnavailable {
            endpoint: client.endpoint().to_string(),
            source: Box::new(err),
        })?;

        if !health.is_healthy() {
            return Err(SetupError::MemoryInitError(format!(
                "A-mem service reports status '{}'",
                health.status
            )));
        }

        log::info!(
            "Connected to {} {} at {}",
            if health.service.is_empty() { "A-mem service" } else { health.service.as_str() },
            health.version.as_deref().unwrap_or("(unknown version)"),
            client.endpoint()
        );

        Ok(Box::new(client))
    }
}
