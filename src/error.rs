//! Error types for companion-memory.

use thiserror::Error;

/// Result type alias using companion-memory's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while maintaining a user's memory.
#[derive(Error, Debug)]
pub enum Error {
    /// LLM API error
    #[error("LLM API error: {provider} - {message}")]
    LlmApi { provider: String, message: String },

    /// LLM error (simple variant)
    #[error("LLM error: {0}")]
    LLM(String),

    /// Timeout during operation
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Provider reply did not match the expected schema
    #[error("Invalid provider reply: {0}")]
    InvalidReply(String),

    /// Memory storage error
    #[error("Memory storage error: {0}")]
    MemoryStorage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pushing rendered memory to the prompt assembler failed
    #[error("Prompt sync failed: {0}")]
    PromptSync(String),

    /// The background queue is at capacity
    #[error("Memory worker queue is full")]
    QueueFull,

    /// The background workers have shut down
    #[error("Memory worker has shut down")]
    WorkerClosed,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an LLM API error.
    pub fn llm_api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LlmApi {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a prompt sync error.
    pub fn prompt_sync(message: impl Into<String>) -> Self {
        Self::PromptSync(message.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::MemoryStorage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::llm_api("gemini", "quota exceeded").to_string(),
            "LLM API error: gemini - quota exceeded"
        );
        assert_eq!(
            Error::timeout(1500).to_string(),
            "Operation timed out after 1500ms"
        );
        assert_eq!(Error::QueueFull.to_string(), "Memory worker queue is full");
    }

    #[test]
    fn test_serde_error_converts() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
