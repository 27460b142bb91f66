//! Hugging Face client error types.

use thiserror::Error;

pub type HfResult<T> = Result<T, HfError>;

#[derive(Debug, Error)]
pub enum HfError {
    #[error("Invalid Hugging Face API token")]
    InvalidToken,

    #[error("HF API error: {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid file path in repository: {0}")]
    InvalidPath(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HfError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status reported by the remote service, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            HfError::Api { status, .. } => Some(*status),
            HfError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
