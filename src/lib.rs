pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod gemini_engine;
pub mod prompt;
pub mod rate_limit;
pub mod retrying_engine;
pub mod schema;
pub mod server;
pub mod types;
pub mod validator;

pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,mail_triage=debug".into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
