//! HTTP retry policy with exponential backoff.
//!
//! - Max retries: 2 (3 total attempts)
//! - Initial delay: 500ms, doubling, capped at 8s
//! - Down-jitter up to 25% (multiplier in [0.75, 1.0])
//! - Retryable: HTTP 408, 409, 429, 5xx and connection errors
//! - `Retry-After` / `Retry-After-Ms` override the computed delay when sane
//!
//! Every attempt of one logical request carries the same `Idempotency-Key`
//! so the image endpoint never bills twice for a retried generation.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::HeaderMap};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Down-jitter factor (0.25 = up to 25% shorter).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no backoff.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Parse `Retry-After-Ms` (float milliseconds) or `Retry-After` (integer seconds).
///
/// Only values in `(0, 60s)` are honored.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let in_range = |d: Duration| d > Duration::ZERO && d < Duration::from_secs(60);

    if let Some(val) = headers.get("retry-after-ms")
        && let Ok(s) = val.to_str()
        && let Ok(ms) = s.parse::<f64>()
        && ms.is_finite()
        && ms > 0.0
    {
        let duration = Duration::from_secs_f64(ms / 1000.0);
        if in_range(duration) {
            return Some(duration);
        }
    }

    if let Some(val) = headers.get("retry-after")
        && let Ok(s) = val.to_str()
        && let Ok(secs) = s.trim().parse::<u64>()
    {
        let duration = Duration::from_secs(secs);
        if in_range(duration) {
            return Some(duration);
        }
    }

    None
}

#[must_use]
pub fn should_retry(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 409 | 429 | 500..=599)
}

/// Backoff before retry number `backoff_step + 1`.
#[must_use]
pub fn calculate_retry_delay(
    backoff_step: u32,
    config: &RetryConfig,
    headers: Option<&HeaderMap>,
) -> Duration {
    if let Some(delay) = headers.and_then(parse_retry_after) {
        return delay;
    }

    let exponent = i32::try_from(backoff_step).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

#[must_use]
pub fn generate_idempotency_key() -> String {
    format!("kxpert-{}", Uuid::new_v4())
}

/// Outcome of a retried request.
#[derive(Debug)]
pub enum RetryOutcome {
    /// 2xx response.
    Success(Response),
    /// Non-2xx response after retries were exhausted or not allowed.
    HttpError(Response),
    /// Transport failure.
    ConnectionError { attempts: u32, source: reqwest::Error },
}

/// Send a request, retrying transient failures.
///
/// `build_request` is called once per attempt.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let idempotency_key = generate_idempotency_key();
    let mut attempt: u32 = 0;

    loop {
        let last_attempt = attempt >= config.max_retries;
        let request = build_request()
            .header("Idempotency-Key", &idempotency_key)
            .header("X-Retry-Count", attempt.to_string());

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                return RetryOutcome::Success(response);
            }
            Ok(response) => {
                let status = response.status();
                if last_attempt || !should_retry(status) {
                    return RetryOutcome::HttpError(response);
                }
                let delay = calculate_retry_delay(attempt, config, Some(response.headers()));
                tracing::debug!(
                    status = %status,
                    retry_count = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying request after error status"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if last_attempt || !is_retryable_error(&e) {
                    return RetryOutcome::ConnectionError {
                        attempts: attempt + 1,
                        source: e,
                    };
                }
                let delay = calculate_retry_delay(attempt, config, None);
                tracing::debug!(
                    error = %e,
                    retry_count = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying request after connection error"
                );
                tokio::time::sleep(delay).await;
            }
        }
        attempt += 1;
    }
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}
