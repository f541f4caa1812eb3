// Error types shared across layers
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Error)]
pub enum SloError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed chart key; always recovered locally
    #[error("parse error: {0}")]
    Parse(String),

    #[error("not configured: {0}")]
    Configuration(String),
}

pub type SloResult<T> = Result<T, SloError>;
