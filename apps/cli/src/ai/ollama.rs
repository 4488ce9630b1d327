use crate::error::{Result, SetupError};
use crate::types::{OllamaModelInfo, PullProgress};

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const PULL_TIMEOUT: Duration = Duration::from_secs(600);

pub struct OllamaClient {
    endpoint: String,
    http: Client,
}

/// Why `/api/tags` did not produce a model list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagsError {
    /// Connection refused, DNS failure or timeout
    Unreachable(String),
    UnexpectedStatus(u16),
    Malformed(String),
}

impl std::fmt::Display for TagsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagsError::Unreachable(reason) => write!(f, "not reachable: {}", reason),
            TagsError::UnexpectedStatus(code) => write!(f, "responded with status {}", code),
            TagsError::Malformed(reason) => write!(f, "returned an unreadable model list: {}", reason),
        }
    }
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self { endpoint: endpoint.into().trim_end_matches('/').to_string(), http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `GET /api/tags` bounded by `timeout`
    pub async fn tags(
        &self,
        timeout: Duration,
    ) -> std::result::Result<Vec<OllamaModelInfo>, TagsError> {
        let url = format!("{}/api/tags", self.endpoint);

        let response = self
            .http
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|error| TagsError::Unreachable(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TagsError::UnexpectedStatus(status.as_u16()));
        }

        let payload: TagsResponse =
            response.json().await.map_err(|error| TagsError::Malformed(error.to_string()))?;

        Ok(payload.models)
    }

    /// Stream `POST /api/pull` until the server reports success
    pub async fn pull_model(&self, model: &str) -> Result<()> {
        let url = format!("{}/api/pull", self.endpoint);
        let response = self
            .http
            .post(&url)
            .timeout(PULL_TIMEOUT)
            .json(&PullRequest { name: model.to_string(), stream: true })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(SetupError::OllamaError(format!(
                "Failed to pull model {}: HTTP {}: {}",
                model,
                status,
                body.trim()
            )));
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut last_status = String::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk: Bytes = chunk_result?;
            buffer.extend_from_slice(&chunk);

            for line in take_lines(&mut buffer) {
                if handle_pull_line(model, &line, &mut last_status)? {
                    return Ok(());
                }
            }
        }

        if handle_pull_line(model, &String::from_utf8_lossy(&buffer), &mut last_status)? {
            return Ok(());
        }

        Err(SetupError::OllamaError(format!(
            "Pull of {} ended without a success status (last status: {})",
            model,
            if last_status.is_empty() { "none" } else { last_status.as_str() }
        )))
    }

    pub async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.endpoint);
        let response = self
            .http
            .post(&url)
            .json(&EmbedRequest { model: model.to_string(), input: inputs })
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(SetupError::OllamaError(format!(
                "Embedding request failed: {}",
                body.trim()
            )));
        }

        let payload: EmbedResponse = response.json().await?;

        Ok(payload.embeddings)
    }
}

/// Drains every complete line from `buffer`; a trailing partial line stays
/// buffered so multibyte characters split across chunks decode intact.
fn take_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(newline_pos) = buffer.iter().position(|byte| *byte == b'\n') {
        let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
        lines.push(String::from_utf8_lossy(&line[..newline_pos]).into_owned());
    }
    lines
}

/// Returns `Ok(true)` once the stream reports success
fn handle_pull_line(model: &str, line: &str, last_status: &mut String) -> Result<bool> {
    if line.trim().is_empty() {
        return Ok(false);
    }

    let progress: PullProgress = serde_json::from_str(line.trim())
        .map_err(|error| SetupError::OllamaError(error.to_string()))?;

    if let Some(error) = progress.error.as_deref() {
        return Err(SetupError::OllamaError(format!("Failed to pull model {}: {}", model, error)));
    }

    if progress.is_success() {
        log::info!("Pulled {}", model);
        return Ok(true);
    }

    if let Some(status) = progress.status.as_deref() {
        match progress.percent() {
            Some(percent) => log::debug!("{}: {} ({:.1}%)", model, status, percent),
            None if status != last_status.as_str() => log::info!("{}: {}", model, status),
            None => {}
        }
        *last_status = status.to_string();
    }

    Ok(false)
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelInfo>,
}

#[derive(Debug, Serialize)]
struct PullRequest {
    name: String,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: String,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}
