use crate::error::{Error, Result};
use async_trait::async_trait;
use getset::CopyGetters;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use surf::Client;
use utils::surf_logging::SurfLogging;
use utils::Url;

/// Raw upstream answer, before any status handling.
#[derive(Debug, Clone, Default)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Raw `Retry-After` header value, if any
    pub retry_after: Option<String>,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 429 and 5xx are worth another attempt, everything else is final.
    pub fn is_retriable(&self) -> bool {
        self.status == 429 || self.status >= 500
    }
}

/// Issues a single GET against the upstream. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<UpstreamResponse>;
}

pub struct SurfTransport {
    http: Client,
}

impl Default for SurfTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfTransport {
    pub fn new() -> Self {
        Self {
            http: Client::new().with(SurfLogging),
        }
    }
}

#[async_trait]
impl Transport for SurfTransport {
    async fn get(&self, url: &Url) -> Result<UpstreamResponse> {
        let mut response = self
            .http
            .get(url.as_str())
            .header("Accept", "application/json")
            .await
            .map_err(Error::transport)?;

        let status = u16::from(response.status());
        let retry_after = response
            .header("Retry-After")
            .map(|values| values.last().as_str().to_string());
        let body = response.body_string().await.map_err(Error::transport)?;

        Ok(UpstreamResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[derive(Debug, Clone, Copy, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    max_attempts: u32,
    /// Multiplied by `attempt + 1` after a 5xx
    server_error_backoff: Duration,
    /// Wait after a 429 without a usable `Retry-After`
    rate_limit_fallback: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            server_error_backoff: Duration::from_millis(500),
            rate_limit_fallback: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        server_error_backoff: Duration,
        rate_limit_fallback: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            server_error_backoff,
            rate_limit_fallback,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Wait before the attempt following `attempt` (zero based).
    pub fn delay_for(&self, response: &UpstreamResponse, attempt: u32) -> Duration {
        if response.status == 429 {
            parse_retry_after(response.retry_after.as_deref())
                .unwrap_or(self.rate_limit_fallback)
        } else {
            self.server_error_backoff * (attempt + 1)
        }
    }
}

/// Seconds from a `Retry-After` value, only when it is a positive integer.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|seconds| *seconds > 0)
        .map(Duration::from_secs)
}

/// GETs JSON from the upstream, retrying rate limits and server errors.
/// Transport failures are returned as-is without another attempt.
#[derive(Clone)]
pub struct RetryFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetryFetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let mut last_status = 500;

        for attempt in 0..self.policy.max_attempts {
            let response = self.transport.get(url).await?;

            if response.is_success() {
                return Ok(serde_json::from_str(&response.body)?);
            }

            last_status = response.status;
            if !response.is_retriable() || attempt + 1 == self.policy.max_attempts {
                return Err(Error::upstream(response.status));
            }

            let delay = self.policy.delay_for(&response, attempt);
            log::warn!(
                "Upstream answered {} for {} (attempt {}/{}), retrying in {}ms",
                response.status,
                url,
                attempt + 1,
                self.policy.max_attempts,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        Err(Error::upstream(last_status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ScriptedTransport;
    use crate::ErrorKind;
    use serde_json::Value;
    use tokio::time::Instant;

    fn url() -> Url {
        Url::parse("http://upstream.test/anime/1").unwrap()
    }

    fn fetcher(transport: &Arc<ScriptedTransport>) -> RetryFetcher {
        RetryFetcher::new(transport.clone(), RetryPolicy::default())
    }

    #[test]
    fn retry_after_must_be_a_positive_integer() {
        assert_eq!(parse_retry_after(Some("2")), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(Some(" 5 ")), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(Some("0")), None);
        assert_eq!(parse_retry_after(Some("-3")), None);
        assert_eq!(parse_retry_after(Some("soon")), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn server_errors_back_off_linearly() {
        let policy = RetryPolicy::default();
        let response = UpstreamResponse {
            status: 503,
            ..Default::default()
        };
        assert_eq!(policy.delay_for(&response, 0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(&response, 1), Duration::from_millis(1000));
    }

    #[test]
    fn rate_limit_without_hint_waits_one_second() {
        let policy = RetryPolicy::default();
        let response = UpstreamResponse {
            status: 429,
            retry_after: Some("tomorrow".into()),
            ..Default::default()
        };
        assert_eq!(policy.delay_for(&response, 0), Duration::from_secs(1));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn success_returns_immediately() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, r#"{"data":1}"#);
        let value: Value = fetcher(&transport).fetch_json(&url()).await.unwrap();
        assert_eq!(value["data"], 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn honours_retry_after_on_rate_limit() {
        let transport = ScriptedTransport::new();
        transport.push_rate_limited(Some("2"));
        transport.push_json(200, r#"{"data":[]}"#);

        let started = Instant::now();
        let _: Value = fetcher(&transport).fetch_json(&url()).await.unwrap();
        let waited = started.elapsed();

        assert!(waited >= Duration::from_secs(2));
        assert!(waited < Duration::from_millis(2100));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn three_server_errors_exhaust_attempts() {
        let transport = ScriptedTransport::new();
        transport.push_status(500);
        transport.push_status(500);
        transport.push_status(500);
        transport.push_json(200, r#"{"data":[]}"#);

        let started = Instant::now();
        let err = fetcher(&transport)
            .fetch_json::<Value>(&url())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Upstream { status: 500 });
        assert_eq!(transport.calls(), 3);
        // 500ms after the first failure, 1000ms after the second.
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(started.elapsed() < Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn second_server_error_waits_a_full_second() {
        let transport = ScriptedTransport::new();
        transport.push_status(502);
        transport.push_status(500);
        transport.push_json(200, r#"{"data":[]}"#);

        let fetcher = fetcher(&transport);
        let fetch = tokio::spawn(async move { fetcher.fetch_json::<Value>(&url()).await });

        tokio::time::sleep(Duration::from_millis(501)).await;
        assert_eq!(transport.calls(), 2);
        tokio::time::sleep(Duration::from_millis(998)).await;
        assert_eq!(transport.calls(), 2);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(transport.calls(), 3);

        assert!(fetch.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_are_not_retried() {
        let transport = ScriptedTransport::new();
        transport.push_status(404);
        let err = fetcher(&transport)
            .fetch_json::<Value>(&url())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_not_retried() {
        let transport = ScriptedTransport::new();
        transport.push_transport_error("connection refused");
        transport.push_json(200, r#"{"data":[]}"#);
        let err = fetcher(&transport)
            .fetch_json::<Value>(&url())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_body_is_a_decode_error() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, "<html>");
        let err = fetcher(&transport)
            .fetch_json::<Value>(&url())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
