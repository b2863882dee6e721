//! Transfer wrapper around the host HTTP client
//!
//! Applies the query's timeout and redirect cap to every request and races it
//! against a cancellation token, so an observer that stops the pipeline also
//! aborts transfers that are still in flight. An optional per-host rate limit
//! keeps consecutive requests to one service apart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bridge_traits::error::BridgeError;
use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use bytes::Bytes;
use core_runtime::logging::redact_url;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{MetadataError, Result};
use crate::query::Query;

/// Enforces a minimum delay between requests to the same host
struct RateLimiter {
    min_delay: Duration,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve the next slot for `host` and sleep until it comes up
    async fn wait_if_needed(&self, host: &str) {
        let now = Instant::now();
        let slot = {
            let mut last_request = self.last_request.lock().await;
            let slot = match last_request.get(host) {
                Some(last) => (*last + self.min_delay).max(now),
                None => now,
            };
            last_request.insert(host.to_string(), slot);
            slot
        };

        if slot > now {
            let wait_time = slot - now;
            debug!(host, "Rate limiting: waiting {:?}", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }
}

#[derive(Clone)]
pub struct Transfer {
    http_client: Arc<dyn HttpClient>,
    retry_policy: RetryPolicy,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl Transfer {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            retry_policy: RetryPolicy::default(),
            rate_limiter: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Keep requests to one host at least `min_delay` apart; zero disables
    pub fn with_rate_limit(mut self, min_delay: Duration) -> Self {
        self.rate_limiter = if min_delay.is_zero() {
            None
        } else {
            Some(Arc::new(RateLimiter::new(min_delay)))
        };
        self
    }

    pub fn http_client(&self) -> &Arc<dyn HttpClient> {
        &self.http_client
    }

    /// Fetch `url`, failing with `StoppedByCallback` when `cancel` fires first.
    ///
    /// Non-2xx responses are errors.
    pub async fn fetch(
        &self,
        url: &str,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        if cancel.is_cancelled() {
            return Err(MetadataError::StoppedByCallback);
        }

        let request = HttpRequest::get(url)
            .timeout(query.timeout())
            .max_redirects(query.redirects());

        trace!(url = %redact_url(url), "Starting transfer");

        let send = async {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait_if_needed(host_of(url)).await;
            }
            self.http_client
                .execute_with_retry(request, self.retry_policy.clone())
                .await
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MetadataError::StoppedByCallback),
            response = send => response?,
        };

        if !response.is_success() {
            return Err(MetadataError::Bridge(BridgeError::OperationFailed(format!(
                "HTTP {}",
                response.status
            ))));
        }

        trace!(url = %redact_url(url), bytes = response.body.len(), "Transfer complete");
        Ok(response.body)
    }

    /// Like [`Transfer::fetch`], but any failure is just "nothing"
    pub async fn download(
        &self,
        url: &str,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Option<Bytes> {
        match self.fetch(url, query, cancel).await {
            Ok(body) => Some(body),
            Err(MetadataError::StoppedByCallback) => {
                debug!(url = %redact_url(url), "Transfer cancelled");
                None
            }
            Err(err) => {
                debug!(url = %redact_url(url), error = %err, "Transfer failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for Transfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transfer")
            .field("retry_policy", &self.retry_policy)
            .field(
                "rate_limit",
                &self.rate_limiter.as_ref().map(|limiter| limiter.min_delay),
            )
            .finish_non_exhaustive()
    }
}

/// Host part of a URL, or the whole string when it has no scheme
fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use mockall::mock;

    mock! {
        Client {}

        #[async_trait]
        impl HttpClient for Client {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    #[tokio::test]
    async fn test_request_carries_query_limits() {
        let mut client = MockClient::new();
        client
            .expect_execute()
            .withf(|request| {
                request.timeout == Some(Duration::from_secs(7)) && request.max_redirects == Some(3)
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::ok("body")));

        let mut query = Query::new();
        query.set_timeout(Duration::from_secs(7));
        query.set_redirects(3);

        let transfer = Transfer::new(Arc::new(client));
        let body = transfer
            .download("https://example.com/x", &query, &CancellationToken::new())
            .await;

        assert_eq!(body, Some(Bytes::from_static(b"body")));
    }

    #[tokio::test]
    async fn test_non_success_yields_nothing() {
        let mut client = MockClient::new();
        client
            .expect_execute()
            .returning(|_| Ok(HttpResponse::with_status(404)));

        let transfer = Transfer::new(Arc::new(client));
        let body = transfer
            .download("https://example.com/x", &Query::new(), &CancellationToken::new())
            .await;

        assert!(body.is_none());
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://lrclib.net/api/get?x=1"), "lrclib.net");
        assert_eq!(host_of("http://127.0.0.1:8080"), "127.0.0.1:8080");
        assert_eq!(host_of("api.deezer.com/search"), "api.deezer.com");
    }

    #[tokio::test]
    async fn test_rate_limit_spaces_requests_to_same_host() {
        let mut client = MockClient::new();
        client
            .expect_execute()
            .times(2)
            .returning(|_| Ok(HttpResponse::ok("ok")));

        let transfer = Transfer::new(Arc::new(client)).with_rate_limit(Duration::from_millis(50));
        let query = Query::new();
        let token = CancellationToken::new();

        let started = Instant::now();
        transfer.fetch("https://a.example/1", &query, &token).await.unwrap();
        transfer.fetch("https://a.example/2", &query, &token).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_request() {
        let mut client = MockClient::new();
        client.expect_execute().times(0);

        let token = CancellationToken::new();
        token.cancel();

        let transfer = Transfer::new(Arc::new(client));
        let result = transfer.fetch("https://example.com/x", &Query::new(), &token).await;

        assert!(matches!(result, Err(MetadataError::StoppedByCallback)));
    }
}
