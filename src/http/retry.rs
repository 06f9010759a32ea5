// Retry loop for the reqwest-based source clients (Linear, Slab, webhooks)

use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::observability::source_metrics;
use crate::sources::SourceError;

/// Longest wait honoured from a `Retry-After` header.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Exponential delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// Send the request built by `build`, retrying timeouts, connection errors,
/// 429 and 5xx responses. Other 4xx responses fail immediately.
pub async fn send_with_retry<F>(config: &RetryConfig, build: F) -> Result<Response, SourceError>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error = String::new();
    let mut waited_retry_after = false;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            source_metrics().record_retry();
            if waited_retry_after {
                waited_retry_after = false;
                debug!(attempt, "retrying after Retry-After wait");
            } else {
                let delay = config.backoff(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying after backoff");
                tokio::time::sleep(delay).await;
            }
        }

        let response = match build().send().await {
            Ok(resp) => resp,
            Err(e) => {
                last_error = e.to_string();
                if e.is_timeout() || e.is_connect() {
                    continue;
                }
                return Err(SourceError::Request(e));
            }
        };

        let status = response.status();

        if status.is_success() {
            debug!(%status, attempt, "request succeeded");
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            // No wait once the last attempt is spent
            if attempt < config.max_retries {
                if let Some(wait) = retry_after(&response) {
                    warn!(wait_secs = wait.as_secs(), "rate-limited, waiting Retry-After");
                    tokio::time::sleep(wait).await;
                    waited_retry_after = true;
                }
            }
            last_error = "429 Too Many Requests".to_string();
            continue;
        }

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            last_error = format!("{status}: {body}");
            continue;
        }

        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Http { status, body });
    }

    Err(SourceError::MaxRetriesExceeded {
        attempts: config.max_retries + 1,
        last_error,
    })
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}
