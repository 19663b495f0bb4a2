#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

use mail_triage::engine::{Engine, EngineError};
use mail_triage::rate_limit::AddressRateLimiter;
use mail_triage::server::{self, AppState};
use mail_triage::types::RawModelOutput;
use mail_triage::validator::ResponseValidator;

/// Returns a fixed reply and counts how often it was asked.
pub struct FakeEngine {
    reply: Box<dyn Fn() -> Result<RawModelOutput, EngineError> + Send + Sync>,
    calls: AtomicUsize,
}

impl FakeEngine {
    pub fn replying(text: impl Into<String>) -> Arc<Self> {
        let text = text.into();
        Arc::new(Self {
            reply: Box::new(move || Ok(RawModelOutput::new(text.clone()))),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(move || Err(EngineError::from_status(status))),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn classify(&self, _prompt: &str) -> Result<RawModelOutput, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)()
    }
}

pub fn productive_payload() -> Value {
    json!({
        "category": "Productive",
        "suggested_response": "On it, we'll restore the server shortly.",
        "purpose": "Incidente de suporte",
        "probability": 0.97,
        "justification": "Pedido urgente relacionado ao trabalho"
    })
}

pub fn validator() -> Arc<ResponseValidator> {
    Arc::new(ResponseValidator::new().unwrap())
}

pub fn app(engine: Option<Arc<FakeEngine>>, rate_limiter: Option<AddressRateLimiter>) -> Router {
    let engine = engine.map(|engine| engine as Arc<dyn Engine + Send + Sync>);
    server::router(AppState::new(engine, validator()), rate_limiter)
}

pub fn post_email(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn from_address(mut request: Request<Body>, address: &str) -> Request<Body> {
    let addr: SocketAddr = address.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body, content_type)
}
