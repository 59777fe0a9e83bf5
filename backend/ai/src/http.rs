//! Shared HTTP plumbing: status classification, envelope parsing and
//! rate-limit backoff.

use std::future::Future;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use snapsolve_core::{AiError, ProviderKind};

/// Exponential backoff applied to HTTP 429 only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Delay before retry number `retry` (0-based): base, 2×base, 4×base, …
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Run `op` and retry it while it reports a rate limit.
///
/// `op` receives the 0-based attempt number. Any error other than a rate
/// limit is returned as is. Once retries are exhausted the error becomes
/// `RateLimit` carrying the total number of attempts.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, provider: ProviderKind, mut op: F) -> Result<T, AiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Err(e) if e.is_rate_limit() => {
                if attempt >= policy.max_retries {
                    return Err(AiError::RateLimit {
                        provider,
                        attempts: attempt + 1,
                    });
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    provider = %provider,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Send a request, classify the status and decode the JSON envelope.
///
/// `build` is called once per attempt because a `RequestBuilder` is consumed
/// by sending.
pub async fn send_json<T, B>(policy: &RetryPolicy, provider: ProviderKind, build: B) -> Result<T, AiError>
where
    T: DeserializeOwned,
    B: Fn() -> RequestBuilder,
{
    with_backoff(policy, provider, |attempt| {
        let request = build();
        async move {
            debug!(provider = %provider, attempt = attempt + 1, "Sending AI request");
            let response = request
                .send()
                .await
                .map_err(|e| AiError::transport(provider, e.to_string()))?;
            let response = check_status(provider, response).await?;
            parse_envelope(provider, response).await
        }
    })
    .await
}

/// Single attempt, no backoff. Used for listing endpoints.
pub async fn fetch_json<T: DeserializeOwned>(provider: ProviderKind, request: RequestBuilder) -> Result<T, AiError> {
    let response = request
        .send()
        .await
        .map_err(|e| AiError::transport(provider, e.to_string()))?;
    let response = check_status(provider, response).await?;
    parse_envelope(provider, response).await
}

/// Map non-2xx statuses onto the error taxonomy.
pub async fn check_status(provider: ProviderKind, response: Response) -> Result<Response, AiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = upstream_message(&body).unwrap_or_else(|| status_text(status));

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AiError::Auth {
            provider,
            credential: provider.credential_name().to_string(),
            detail: format!("HTTP {}: {}", status.as_u16(), message),
        },
        StatusCode::TOO_MANY_REQUESTS => AiError::RateLimit { provider, attempts: 1 },
        _ => AiError::Upstream {
            provider,
            status: status.as_u16(),
            message,
        },
    })
}

async fn parse_envelope<T: DeserializeOwned>(provider: ProviderKind, response: Response) -> Result<T, AiError> {
    let body = response
        .text()
        .await
        .map_err(|e| AiError::transport(provider, format!("failed to read body: {e}")))?;
    serde_json::from_str(&body).map_err(|e| AiError::protocol(provider, e.to_string()))
}

/// Pull a human message out of the common error envelopes:
/// `{"error": {"message": ..}}`, `{"error": ".."}` or a plain text body.
fn upstream_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => value
            .pointer("/error/message")
            .or_else(|| value.get("error"))
            .or_else(|| value.get("message"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| Some(trimmed.to_string())),
        Err(_) => Some(trimmed.to_string()),
    }
}

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("unexpected status").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn rate_limited() -> AiError {
        AiError::RateLimit {
            provider: ProviderKind::Gemini,
            attempts: 1,
        }
    }

    #[test]
    fn test_delay_schedule_doubles() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (0..3).map(|n| policy.delay_for(n)).collect();
        assert_eq!(
            delays,
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_rate_limits_then_success() {
        let started = Instant::now();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_op = Arc::clone(&seen);

        let answer = with_backoff(&RetryPolicy::default(), ProviderKind::Gemini, move |attempt| {
            seen_in_op.lock().unwrap().push(started.elapsed());
            async move {
                if attempt < 3 {
                    Err(rate_limited())
                } else {
                    Ok("Paris")
                }
            }
        })
        .await;

        assert_eq!(answer, Ok("Paris"));
        let at = seen.lock().unwrap().clone();
        assert_eq!(at.len(), 4);
        let gaps: Vec<_> = at.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_report_attempts() {
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);
        let result: Result<(), _> = with_backoff(&RetryPolicy::default(), ProviderKind::Groq, move |_| {
            *counter.lock().unwrap() += 1;
            async { Err(rate_limited()) }
        })
        .await;

        assert_eq!(
            result,
            Err(AiError::RateLimit {
                provider: ProviderKind::Groq,
                attempts: 4
            })
        );
        assert_eq!(*calls.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);
        let result: Result<(), _> = with_backoff(&RetryPolicy::default(), ProviderKind::Groq, move |_| {
            *counter.lock().unwrap() += 1;
            async { Err(AiError::protocol(ProviderKind::Groq, "missing choices")) }
        })
        .await;

        assert!(matches!(result, Err(AiError::Protocol { .. })));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_upstream_message_extraction() {
        assert_eq!(
            upstream_message(r#"{"error":{"message":"API key not valid"}}"#).as_deref(),
            Some("API key not valid")
        );
        assert_eq!(
            upstream_message(r#"{"error":"Model is loading"}"#).as_deref(),
            Some("Model is loading")
        );
        assert_eq!(upstream_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(upstream_message("  "), None);
    }
}
