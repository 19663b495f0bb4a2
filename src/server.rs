use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    middleware,
    response::Json,
    routing::{MethodRouter, get, post},
};
use metrics::counter;
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::ApiError;
use crate::prompt::build_prompt;
use crate::rate_limit::{self, AddressRateLimiter};
use crate::types::{
    ClassificationRequest, ClassificationResult, LIVENESS_MESSAGE, MessageResponse,
};
use crate::validator::ResponseValidator;

#[derive(Clone)]
pub struct AppState {
    engine: Option<Arc<dyn Engine + Send + Sync>>,
    validator: Arc<ResponseValidator>,
}

impl AppState {
    pub fn new(
        engine: Option<Arc<dyn Engine + Send + Sync>>,
        validator: Arc<ResponseValidator>,
    ) -> Self {
        Self { engine, validator }
    }

    pub fn is_degraded(&self) -> bool {
        self.engine.is_none()
    }
}

/// Every path answers GET with the liveness message and POST with a classification.
pub fn router(state: AppState, rate_limiter: Option<AddressRateLimiter>) -> Router {
    let classify: MethodRouter<AppState> = match rate_limiter {
        Some(limiter) => post(classify_handler)
            .layer(middleware::from_fn_with_state(limiter, rate_limit::enforce)),
        None => post(classify_handler),
    };
    let methods = get(liveness_handler).merge(classify);

    Router::new()
        .route("/", methods.clone())
        .route("/*path", methods)
        .with_state(state)
}

async fn liveness_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: LIVENESS_MESSAGE.to_string(),
    })
}

#[tracing::instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4().simple()))]
async fn classify_handler(
    State(state): State<AppState>,
    payload: Result<Json<ClassificationRequest>, JsonRejection>,
) -> Result<Json<ClassificationResult>, ApiError> {
    counter!("classification_requests_total").increment(1);

    match classify_email(&state, payload).await {
        Ok(result) => {
            tracing::info!(
                category = ?result.category,
                probability = result.probability,
                "Classification completed successfully"
            );
            Ok(Json(result))
        }
        Err(err) => {
            counter!("classification_failures_total", "reason" => err.reason()).increment(1);
            if let ApiError::Upstream(cause) = &err {
                counter!("upstream_failures_total", "kind" => cause.kind()).increment(1);
            }
            tracing::error!(reason = err.reason(), error = %err, "Classification failed");
            Err(err)
        }
    }
}

async fn classify_email(
    state: &AppState,
    payload: Result<Json<ClassificationRequest>, JsonRejection>,
) -> Result<ClassificationResult, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(%rejection, "Request body is not a JSON object");
            return Err(ApiError::InvalidInput);
        }
    };
    let email_text = request.email_text().ok_or(ApiError::InvalidInput)?;

    let engine = state.engine.as_ref().ok_or(ApiError::ModelUnavailable)?;

    tracing::info!(email_len = email_text.len(), "Processing classification request");
    let output = engine.classify(&build_prompt(email_text)).await?;

    state.validator.validate(&output.text).map_err(|err| {
        tracing::warn!(raw_output = %output.text, error = %err, "Model output failed validation");
        ApiError::InvalidModelOutput
    })
}
