use thiserror::Error;

/// Custom error types for amem-setup
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Ollama error: {0}")]
    OllamaError(String),

    #[error("Failed to launch inference server: {0}")]
    LaunchError(String),

    #[error("Embedding model unavailable after {attempts} attempt(s)")]
    ModelUnavailable {
        attempts: usize,
        #[source]
        last_error: Box<SetupError>,
    },

    #[error("Embedding smoke check failed: {0}")]
    SmokeCheckFailed(String),

    #[error("Memory system initialization failed: {0}")]
    MemoryInitError(String),

    #[error("A-mem service at {endpoint} is not available")]
    ServiceUnavailable {
        endpoint: String,
        #[source]
        source: Box<SetupError>,
    },

    #[error("Memory system error: {0}")]
    MemoryError(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),
}

impl SetupError {
    /// Failures that end the run with a non-zero exit and a full error trace
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable { .. }
                | Self::SmokeCheckFailed(_)
                | Self::MemoryInitError(_)
                | Self::ServiceUnavailable { .. }
        )
    }

    /// The message followed by every underlying cause
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            // Wrappers that already print their source inline are not repeated
            let text = cause.to_string();
            if !message.ends_with(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        message
    }
}

impl From<serde_json::Error> for SetupError {
    fn from(err: serde_json::Error) -> Self {
        SetupError::SerializationError(err.to_string())
    }
}

impl From<json5::Error> for SetupError {
    fn from(err: json5::Error) -> Self {
        SetupError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for SetupError {
    fn from(err: std::io::Error) -> Self {
        SetupError::IoError(err.to_string())
    }
}

/// Convert SetupError to String for report lines
impl From<SetupError> for String {
    fn from(err: SetupError) -> Self {
        err.to_string()
    }
}

/// Result type alias for amem-setup operations
pub type Result<T> = std::result::Result<T, SetupError>;
