use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

use mail_triage::config::RetryConfig;
use mail_triage::engine::{Engine, EngineError};
use mail_triage::gemini_engine::{GeminiConfig, GeminiEngine};
use mail_triage::prompt::SYSTEM_INSTRUCTION;
use mail_triage::retrying_engine::RetryingEngine;

#[derive(Clone)]
struct Upstream {
    calls: Arc<AtomicUsize>,
    failures_before_success: usize,
    delay: Duration,
}

fn candidate(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

async fn generate_content(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let call = upstream.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(upstream.delay).await;

    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"message": "API key not valid"}})),
        );
    }
    if call < upstream.failures_before_success {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": {"message": "overloaded"}})),
        );
    }
    if body["systemInstruction"]["parts"][0]["text"] != SYSTEM_INSTRUCTION {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"message": "missing system instruction"}})),
        );
    }

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    (StatusCode::OK, Json(candidate(prompt)))
}

async fn spawn_upstream(upstream: Upstream) -> String {
    let app = Router::new()
        .route(
            "/v1beta/models/:model_action",
            post(generate_content),
        )
        .with_state(upstream);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{address}/v1beta")
}

fn upstream(failures_before_success: usize) -> Upstream {
    Upstream {
        calls: Arc::new(AtomicUsize::new(0)),
        failures_before_success,
        delay: Duration::ZERO,
    }
}

fn engine(api_base: String, api_key: &str, timeout: Duration) -> GeminiEngine {
    GeminiEngine::new(GeminiConfig {
        api_key: Some(api_key.to_string()),
        api_base,
        timeout,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn successful_call_returns_candidate_text() {
    let upstream = upstream(0);
    let base = spawn_upstream(upstream.clone()).await;
    let engine = engine(base, "test-key", Duration::from_secs(5));

    let output = engine.classify("PROMPT BODY").await.unwrap();

    assert_eq!(output.text, "PROMPT BODY");
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_key_is_a_permanent_status_error() {
    let base = spawn_upstream(upstream(0)).await;
    let engine = engine(base, "wrong-key", Duration::from_secs(5));

    let err = engine.classify("PROMPT").await.unwrap_err();

    assert!(matches!(err, EngineError::Status { status: 403, .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let mut slow = upstream(0);
    slow.delay = Duration::from_millis(500);
    let base = spawn_upstream(slow).await;
    let engine = engine(base, "test-key", Duration::from_millis(50));

    let err = engine.classify("PROMPT").await.unwrap_err();

    assert!(matches!(err, EngineError::Timeout));
}

#[tokio::test]
async fn retrying_engine_recovers_from_overload() {
    let upstream = upstream(2);
    let base = spawn_upstream(upstream.clone()).await;
    let engine = RetryingEngine::new(
        RetryConfig {
            max_retries: 2,
            backoff_base: Duration::from_millis(1),
            backoff_max: Duration::from_millis(5),
            deadline: Duration::from_secs(10),
        },
        engine(base, "test-key", Duration::from_secs(5)),
    );

    let output = engine.classify("PROMPT").await.unwrap();

    assert_eq!(output.text, "PROMPT");
    assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
}
