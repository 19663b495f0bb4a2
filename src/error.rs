use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::engine::EngineError;
use crate::types::ErrorResponse;

/// Failures a caller can observe. Each renders as `{"error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No email text provided")]
    InvalidInput,

    #[error("Gemini model not initialized")]
    ModelUnavailable,

    #[error("Failed to process email: {0}")]
    Upstream(#[from] EngineError),

    #[error("AI failed to generate a valid response")]
    InvalidModelOutput,

    #[error("Rate limit exceeded: {0}")]
    RateLimited(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::ModelUnavailable | Self::Upstream(_) | Self::InvalidModelOutput => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::ModelUnavailable => "model_unavailable",
            Self::Upstream(_) => "upstream",
            Self::InvalidModelOutput => "invalid_model_output",
            Self::RateLimited(_) => "rate_limited",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_taxonomy() {
        assert_eq!(ApiError::InvalidInput.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::ModelUnavailable.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::RateLimited("per hour").status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn upstream_message_wraps_cause() {
        let err = ApiError::from(EngineError::from_status(429));
        assert_eq!(
            err.to_string(),
            "Failed to process email: upstream returned status 429"
        );
    }
}
