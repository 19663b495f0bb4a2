use clap::{Args, Parser};
use std::time::Duration;

use crate::gemini_engine::{DEFAULT_API_BASE, DEFAULT_MODEL, GeminiConfig};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "5001")]
    pub port: u16,

    #[command(flatten)]
    pub gemini: GeminiArgs,

    #[command(flatten)]
    pub retry: RetryArgs,

    /// Requests allowed per client address per hour
    #[arg(long, env = "RATE_LIMIT_PER_HOUR", default_value = "20")]
    pub rate_limit_per_hour: u32,

    /// Requests allowed per client address per day
    #[arg(long, env = "RATE_LIMIT_PER_DAY", default_value = "100")]
    pub rate_limit_per_day: u32,

    /// Turn off per-address rate limiting
    #[arg(long, env = "DISABLE_RATE_LIMIT")]
    pub disable_rate_limit: bool,

    /// Single origin allowed by CORS, e.g. "https://mail-triage.example"
    #[arg(long, env = "ALLOWED_ORIGIN")]
    pub allowed_origin: Option<String>,

    /// Expose Prometheus metrics on /metrics
    #[arg(long, env = "ENABLE_METRICS")]
    pub enable_metrics: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

/// Options for the golden-dataset evaluation run.
#[derive(Debug, Clone, Parser)]
#[command(author, version, long_about = None)]
pub struct EvalConfig {
    #[command(flatten)]
    pub gemini: GeminiArgs,

    #[command(flatten)]
    pub retry: RetryArgs,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct GeminiArgs {
    /// API key for the Gemini generative language API
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model used for classification
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the generative language API
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Timeout in seconds for a single upstream call
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Args)]
pub struct RetryArgs {
    /// Extra attempts for transient upstream failures
    #[arg(long, env = "MAX_RETRIES", default_value = "2")]
    pub max_retries: u32,

    /// Initial backoff in milliseconds between retries
    #[arg(long, env = "BACKOFF_BASE_MS", default_value = "250")]
    pub backoff_base_ms: u64,

    /// Upper bound in milliseconds for a single backoff
    #[arg(long, env = "BACKOFF_MAX_MS", default_value = "4000")]
    pub backoff_max_ms: u64,

    /// Budget in seconds for one classification, across all attempts and backoff
    #[arg(long, env = "CLASSIFY_DEADLINE_SECS", default_value = "45")]
    pub classify_deadline_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub deadline: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_millis(250),
            backoff_max: Duration::from_secs(4),
            deadline: Duration::from_secs(45),
        }
    }
}

impl From<&RetryArgs> for RetryConfig {
    fn from(args: &RetryArgs) -> Self {
        Self {
            max_retries: args.max_retries,
            backoff_base: Duration::from_millis(args.backoff_base_ms),
            backoff_max: Duration::from_millis(args.backoff_max_ms),
            deadline: Duration::from_secs(args.classify_deadline_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub per_hour: u32,
    pub per_day: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_hour: 20,
            per_day: 100,
        }
    }
}

impl From<&Config> for RateLimitConfig {
    fn from(config: &Config) -> Self {
        Self {
            enabled: !config.disable_rate_limit,
            per_hour: config.rate_limit_per_hour,
            per_day: config.rate_limit_per_day,
        }
    }
}

impl From<&GeminiArgs> for GeminiConfig {
    fn from(args: &GeminiArgs) -> Self {
        Self {
            api_key: args.gemini_api_key.clone(),
            model: args.model.clone(),
            api_base: args.api_base.clone(),
            timeout: Duration::from_secs(args.request_timeout_secs),
        }
    }
}

impl Config {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
