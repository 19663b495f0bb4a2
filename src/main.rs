use axum::{
    http::{HeaderValue, Method, header},
    routing::get,
};
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use mail_triage::config::{Config, RateLimitConfig, RetryConfig};
use mail_triage::engine::Engine;
use mail_triage::gemini_engine::{GeminiConfig, GeminiEngine};
use mail_triage::rate_limit::AddressRateLimiter;
use mail_triage::retrying_engine::RetryingEngine;
use mail_triage::server::{self, AppState};
use mail_triage::validator::ResponseValidator;

const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::parse();
    mail_triage::init_tracing(config.log_json);
    tracing::info!(
        address = %config.server_address(),
        model = %config.gemini.model,
        rate_limited = !config.disable_rate_limit,
        "Starting mail triage server"
    );

    let engine = build_engine(&config);
    let validator = Arc::new(ResponseValidator::new()?);
    let state = AppState::new(engine, validator);
    if state.is_degraded() {
        tracing::warn!("Serving in degraded mode: every classification request will fail");
    }

    let rate_limit_config = RateLimitConfig::from(&config);
    let rate_limiter = if rate_limit_config.enabled {
        let limiter = AddressRateLimiter::new(&rate_limit_config)?;
        spawn_rate_limit_pruner(limiter.clone());
        Some(limiter)
    } else {
        None
    };

    let mut app = server::router(state, rate_limiter);

    if config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        app = app
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    if let Some(origin) = &config.allowed_origin {
        let origin: HeaderValue = origin.parse()?;
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        );
    }

    let app = app.layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// A client that cannot be built leaves the server up in degraded mode.
fn build_engine(config: &Config) -> Option<Arc<dyn Engine + Send + Sync>> {
    match GeminiEngine::new(GeminiConfig::from(&config.gemini)) {
        Ok(engine) => {
            tracing::info!(model = engine.model(), "Gemini client initialized");
            Some(Arc::new(RetryingEngine::new(
                RetryConfig::from(&config.retry),
                engine,
            )))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Gemini client, classification disabled");
            None
        }
    }
}

fn spawn_rate_limit_pruner(limiter: AddressRateLimiter) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            limiter.retain_recent();
            tracing::debug!(
                tracked_addresses = limiter.tracked_addresses(),
                "Pruned rate limiter state"
            );
        }
    });
}
