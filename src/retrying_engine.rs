use async_trait::async_trait;
use metrics::counter;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::engine::{Engine, EngineError};
use crate::types::RawModelOutput;

/// Retries transient upstream failures with capped exponential backoff.
pub struct RetryingEngine<E> {
    inner: E,
    config: RetryConfig,
}

impl<E: Engine + Send + Sync> RetryingEngine<E> {
    pub fn new(config: RetryConfig, inner: E) -> Self {
        Self { inner, config }
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base.max(Duration::from_millis(1));
        let max = self.config.backoff_max.max(base);
        base.checked_mul(2u32.saturating_pow(attempt))
            .map_or(max, |delay| delay.min(max))
    }
}

#[async_trait]
impl<E: Engine + Send + Sync> Engine for RetryingEngine<E> {
    #[tracing::instrument(
        skip(self, prompt),
        fields(max_retries = self.config.max_retries, deadline = ?self.config.deadline)
    )]
    async fn classify(&self, prompt: &str) -> Result<RawModelOutput, EngineError> {
        match tokio::time::timeout(self.config.deadline, self.attempt_until_settled(prompt)).await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Classification deadline exceeded across retries");
                Err(EngineError::Timeout)
            }
        }
    }
}

impl<E: Engine + Send + Sync> RetryingEngine<E> {
    async fn attempt_until_settled(&self, prompt: &str) -> Result<RawModelOutput, EngineError> {
        let mut attempt = 0;

        loop {
            match self.inner.classify(prompt).await {
                Ok(output) => return Ok(output),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    attempt += 1;
                    counter!("upstream_retries_total").increment(1);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient upstream failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if attempt > 0 {
                        tracing::error!(attempts = attempt + 1, error = %err, "Giving up on upstream call");
                    }
                    return Err(err);
                }
            }
        }
    }
}
