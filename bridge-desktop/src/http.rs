//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use bytes::Bytes;
use reqwest::{redirect::Policy, Client, Url};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// User agent sent when the host does not configure one
pub const DEFAULT_USER_AGENT: &str = concat!("tunefetch/", env!("CARGO_PKG_VERSION"));

/// Redirect budget used when a request does not carry its own limit
const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Per-request timeout and redirect limit
/// - Automatic retry with exponential backoff on 5xx/429
/// - TLS support by default
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client announcing the given user agent
    ///
    /// Some providers (MusicBrainz) reject anonymous clients, so hosts should
    /// pass something like `"MyApp/1.0 (contact@example.com)"`.
    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .redirect(Policy::none())
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                BridgeError::NotAvailable(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Create a new HTTP client with custom configuration
    ///
    /// The supplied client should be built with `redirect::Policy::none()`,
    /// otherwise reqwest follows redirects before the request limit is checked.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Perform a single round trip without following redirects
    async fn send_once(
        &self,
        method: HttpMethod,
        url: Url,
        request: &HttpRequest,
        body: Option<Bytes>,
    ) -> Result<HttpResponse> {
        let mut req = self.client.request(Self::convert_method(method), url);

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if let Some(body) = body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        let response = req.send().await.map_err(|e| convert_error(e, request))?;
        let status = response.status().as_u16();

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| convert_error(e, request))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Execute one attempt, following at most `max_redirects` hops
    async fn send_following_redirects(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let limit = request.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS);
        let mut url = Url::parse(&request.url).map_err(|e| {
            BridgeError::OperationFailed(format!("Invalid URL '{}': {}", request.url, e))
        })?;
        let mut method = request.method;
        let mut body = request.body.clone();
        let mut hops = 0;

        loop {
            let response = self.send_once(method, url.clone(), request, body.clone()).await?;

            if !response.is_redirect() {
                return Ok(response);
            }

            let Some(location) = response.header("location") else {
                return Ok(response);
            };

            if hops >= limit {
                return Err(BridgeError::TooManyRedirects {
                    url: request.url.clone(),
                    limit,
                });
            }

            let next = url.join(location).map_err(|e| {
                BridgeError::OperationFailed(format!(
                    "Invalid redirect target '{}': {}",
                    location, e
                ))
            })?;

            debug!(from = %url, to = %next, hop = hops + 1, "Following redirect");

            // 303 always downgrades, 301/302 downgrade POST like browsers do
            if response.status == 303
                || (matches!(response.status, 301 | 302) && method == HttpMethod::Post)
            {
                method = HttpMethod::Get;
                body = None;
            }

            url = next;
            hops += 1;
        }
    }

    /// Execute request with retry logic
    async fn execute_with_retry_internal(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < policy.max_attempts {
            debug!(
                attempt = attempt + 1,
                max_attempts = policy.max_attempts,
                url = %request.url,
                "Executing HTTP request"
            );

            match self.send_following_redirects(&request).await {
                Ok(response) if response.status >= 500 || response.status == 429 => {
                    warn!(
                        status = response.status,
                        attempt = attempt + 1,
                        "HTTP request failed with retryable status"
                    );
                    last_error = Some(BridgeError::OperationFailed(format!(
                        "HTTP {} error",
                        response.status
                    )));
                }
                Ok(response) => return Ok(response),
                // Redirect loops and bad URLs do not get better by retrying
                Err(e @ BridgeError::TooManyRedirects { .. }) => return Err(e),
                Err(e) => {
                    warn!(error = %e, attempt = attempt + 1, "HTTP request failed");
                    last_error = Some(e);
                }
            }

            attempt += 1;

            if attempt < policy.max_attempts {
                let delay = policy.delay_for(attempt);
                debug!(delay_ms = delay.as_millis(), "Retrying after delay");
                sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BridgeError::OperationFailed("All retry attempts exhausted".to_string())
        }))
    }
}

fn convert_error(error: reqwest::Error, request: &HttpRequest) -> BridgeError {
    if error.is_timeout() {
        BridgeError::Timeout(request.timeout.unwrap_or_default())
    } else if error.is_connect() {
        BridgeError::OperationFailed(format!("Connection failed: {}", error))
    } else {
        BridgeError::OperationFailed(error.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::no_retry())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.execute_with_retry_internal(request, policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a tiny fixed routing table: /start -> /end, /loop -> /loop
    async fn spawn_redirect_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let response = match path.as_str() {
                        "/start" => "HTTP/1.1 302 Found\r\nLocation: /end\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                        "/loop" => "HTTP/1.1 302 Found\r\nLocation: /loop\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                        "/end" => "HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\ndone".to_string(),
                        _ => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                    };
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_client_creation() {
        assert!(ReqwestHttpClient::new().is_ok());
        assert!(ReqwestHttpClient::with_user_agent("Test/1.0 (test@example.com)").is_ok());
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Post),
            reqwest::Method::POST
        );
    }

    #[tokio::test]
    async fn test_follows_redirect_within_limit() {
        let base = spawn_redirect_server().await;
        let client = ReqwestHttpClient::new().unwrap();

        let response = client
            .execute(HttpRequest::get(format!("{}/start", base)).max_redirects(1))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.text().unwrap(), "done");
    }

    #[tokio::test]
    async fn test_redirect_limit_is_enforced() {
        let base = spawn_redirect_server().await;
        let client = ReqwestHttpClient::new().unwrap();

        let result = client
            .execute(HttpRequest::get(format!("{}/start", base)).max_redirects(0))
            .await;
        assert!(matches!(
            result,
            Err(BridgeError::TooManyRedirects { limit: 0, .. })
        ));

        let result = client
            .execute(HttpRequest::get(format!("{}/loop", base)).max_redirects(3))
            .await;
        assert!(matches!(
            result,
            Err(BridgeError::TooManyRedirects { limit: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_not_found_is_not_an_error() {
        let base = spawn_redirect_server().await;
        let client = ReqwestHttpClient::new().unwrap();

        let response = client
            .execute(HttpRequest::get(format!("{}/missing", base)))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert!(response.is_client_error());
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let client = ReqwestHttpClient::new().unwrap();
        let result = client.execute(HttpRequest::get("not a url")).await;
        assert!(matches!(result, Err(BridgeError::OperationFailed(_))));
    }
}
