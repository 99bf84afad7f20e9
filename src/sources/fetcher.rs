use std::time::Duration;

use metrics::counter;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;

const USER_AGENT: &str = "capflow/0.1 (+market-flow-monitor)";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Non-retryable status, e.g. 404 or 403.
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} unavailable after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("failed to decode body from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Shared retry/backoff policy for every upstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per request.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Ceiling for 429 waits.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Resilient JSON GET. Holds nothing but the HTTP client and the policy, so
/// clones are cheap and concurrent fetches never share mutable state.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self { http, policy })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// GET with the configured policy.
    pub async fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        self.fetch(url, params, self.policy.max_retries, self.policy.base_delay)
            .await
    }

    /// GET `url` with query `params`, retrying per the backoff rules:
    ///
    /// - 429: wait `Retry-After` seconds, or `base_delay * 2^attempt`, capped
    /// - 5xx: wait `base_delay * (attempt + 1)`
    /// - timeout / connection error: wait `base_delay`
    /// - any other non-success status fails immediately
    pub async fn fetch(
        &self,
        url: &str,
        params: &[(&str, &str)],
        max_retries: u32,
        base_delay: Duration,
    ) -> Result<Value, FetchError> {
        let target = if params.is_empty() {
            Url::parse(url)
        } else {
            Url::parse_with_params(url, params)
        }
        .map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

        let attempts = max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            let is_last = attempt + 1 == attempts;
            counter!("fetch_requests_total").increment(1);

            let wait = match self.http.get(target.clone()).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        return resp.json::<Value>().await.map_err(|e| FetchError::Decode {
                            url: url.to_string(),
                            reason: e.to_string(),
                        });
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = "rate limited (429)".into();
                        retry_after(resp.headers())
                            .unwrap_or_else(|| exponential_backoff(base_delay, attempt))
                            .min(self.policy.max_backoff)
                    } else if status.is_server_error() {
                        last_error = format!("server error ({})", status.as_u16());
                        base_delay.saturating_mul(attempt + 1)
                    } else {
                        counter!("fetch_failures_total").increment(1);
                        tracing::warn!(url, status = status.as_u16(), "Non-retryable status");
                        return Err(FetchError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                    base_delay
                }
            };

            tracing::debug!(
                url,
                attempt = attempt + 1,
                attempts,
                error = %last_error,
                "Fetch attempt failed"
            );

            if !is_last {
                counter!("fetch_retries_total").increment(1);
                tokio::time::sleep(wait).await;
            }
        }

        counter!("fetch_failures_total").increment(1);
        tracing::warn!(url, attempts, error = %last_error, "Source unavailable");

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn exponential_backoff(base_delay: Duration, attempt: u32) -> Duration {
    base_delay.saturating_mul(1u32 << attempt.min(16))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let base = Duration::from_secs(2);
        assert_eq!(exponential_backoff(base, 0), Duration::from_secs(2));
        assert_eq!(exponential_backoff(base, 1), Duration::from_secs(4));
        assert_eq!(exponential_backoff(base, 3), Duration::from_secs(16));
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        // HTTP-date form is not supported; falls back to exponential
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        let wait = exponential_backoff(Duration::from_secs(10), 5).min(policy.max_backoff);
        assert_eq!(wait, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_fast() {
        let fetcher = Fetcher::new(Duration::from_secs(1), RetryPolicy::default()).unwrap();
        let err = fetcher.get("not a url", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
