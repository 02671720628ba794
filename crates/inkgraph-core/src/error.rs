use thiserror::Error;

/// Errors raised by domain validation and payload normalization.
#[derive(Error, Debug)]
pub enum InkgraphError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid timestamp {value:?}: {reason}")]
    Timestamp { value: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl InkgraphError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, InkgraphError>;
