//! Traced HTTP client for calls to upstream services.
//!
//! Wraps `reqwest::Client` so every outgoing request runs inside an
//! `outgoing_http` span carrying method, url and the resulting status,
//! and is bounded by a per-client timeout.

use std::time::Duration;

use tracing::{field::Empty, Instrument, Level};

#[derive(Clone, Debug)]
pub struct TracedClient {
    inner: reqwest::Client,
    timeout: Option<Duration>,
}

impl TracedClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self {
            inner,
            timeout: None,
        }
    }

    /// Bound every request issued through this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Execute a built request inside an `outgoing_http` span.
    pub async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        if let Some(t) = self.timeout {
            if req.timeout().is_none() {
                *req.timeout_mut() = Some(t);
            }
        }

        let span = tracing::span!(
            Level::INFO,
            "outgoing_http",
            http.method = %req.method(),
            http.url = %redacted_url(req.url()),
            http.status_code = Empty,
            error = Empty,
        );

        let inner = self.inner.clone();
        async move {
            let result = inner.execute(req).await;
            let span = tracing::Span::current();
            match &result {
                Ok(resp) => {
                    span.record("http.status_code", resp.status().as_u16());
                    if resp.status().is_client_error() || resp.status().is_server_error() {
                        span.record("error", true);
                    }
                }
                Err(e) => {
                    span.record("error", true);
                    tracing::warn!(error = %e, timeout = e.is_timeout(), "outgoing request failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Build and execute a request in one go.
    pub async fn send(&self, builder: reqwest::RequestBuilder) -> reqwest::Result<reqwest::Response> {
        let req = builder.build()?;
        self.execute(req).await
    }

    pub async fn get(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        self.send(self.inner.get(url)).await
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.inner.request(method, url)
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

// Query strings may carry filter values; keep them out of span fields.
fn redacted_url(url: &reqwest::Url) -> String {
    let mut u = url.clone();
    u.set_query(None);
    u.to_string()
}

impl From<reqwest::Client> for TracedClient {
    fn from(c: reqwest::Client) -> Self {
        Self::new(c)
    }
}

impl Default for TracedClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}
