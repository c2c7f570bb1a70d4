//! Error types for spriteforge

use thiserror::Error;

/// The main error type for spriteforge operations
#[derive(Debug, Error)]
pub enum ForgeError {
    /// A required API key or secret is absent. Never retried.
    #[error("Missing credential for provider '{0}'")]
    CredentialMissing(String),

    /// A remote generation call failed (bad status, malformed response,
    /// or a task that reported failure). Retryable up to the policy limit.
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// Polling attempts were exhausted without a terminal remote task state.
    /// Treated like a provider error for retry purposes.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Malformed local input. Surfaced immediately, never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),
}

impl ForgeError {
    /// Whether a retry policy may re-attempt the failed call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ForgeError::Provider { .. } | ForgeError::Timeout(_))
    }

    /// Shorthand for a provider failure without an HTTP status.
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        ForgeError::Provider {
            provider: provider.to_string(),
            status: None,
            message: message.into(),
        }
    }
}

/// Result type alias for spriteforge operations
pub type Result<T> = std::result::Result<T, ForgeError>;

impl From<serde_json::Error> for ForgeError {
    fn from(err: serde_json::Error) -> Self {
        ForgeError::Json(err.to_string())
    }
}

impl From<toml::de::Error> for ForgeError {
    fn from(err: toml::de::Error) -> Self {
        ForgeError::TomlParse(err.to_string())
    }
}

impl From<toml::ser::Error> for ForgeError {
    fn from(err: toml::ser::Error) -> Self {
        ForgeError::TomlSer(err.to_string())
    }
}
