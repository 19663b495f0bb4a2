use async_trait::async_trait;

use crate::types::RawModelOutput;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("could not reach upstream: {0}")]
    Transport(String),

    #[error("upstream returned status {status}")]
    Status { status: u16, transient: bool },

    #[error("upstream response could not be decoded: {0}")]
    Decode(String),

    #[error("upstream returned no content: {0}")]
    EmptyResponse(String),
}

impl EngineError {
    pub fn from_status(status: u16) -> Self {
        let transient = status == 408 || status == 429 || status >= 500;
        Self::Status { status, transient }
    }

    /// Whether another attempt might succeed without any change to the request.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Status { transient, .. } => *transient,
            Self::Decode(_) | Self::EmptyResponse(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
            Self::EmptyResponse(_) => "empty_response",
        }
    }
}

#[async_trait]
pub trait Engine {
    async fn classify(&self, prompt: &str) -> Result<RawModelOutput, EngineError>;
}
