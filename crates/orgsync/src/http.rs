//! Transport boundary for all HTTP I/O.
//!
//! The GitLab client only ever issues GET requests, so the boundary is a
//! single `get` capability. Keeping it behind a trait lets unit tests run
//! against an in-memory mock with no sockets involved.

use async_trait::async_trait;
use thiserror::Error;

/// HTTP headers represented as key/value pairs.
///
/// Header names are treated case-insensitively by helper functions.
pub type HttpHeaders = Vec<(String, String)>;

/// A minimal HTTP response.
///
/// Non-2xx statuses are not transport errors; callers interpret the status
/// themselves (a 404 on group detail is tolerated, for example).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Get the first header value matching `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for {url}")]
    NoMockResponse { url: String },
}

/// Transport capability used by the GitLab client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, TransportError>;
}

pub mod reqwest_transport {
    use std::time::Duration as StdDuration;

    use backon::{ExponentialBuilder, Retryable};

    use super::*;

    /// Backoff for transient transport failures (connect errors, timeouts).
    ///
    /// Retry policy lives here, at the transport layer; the sync pipeline
    /// above never retries on its own.
    fn transient_backoff() -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(StdDuration::from_millis(500))
            .with_max_delay(StdDuration::from_secs(10))
            .with_max_times(3)
            .with_jitter()
    }

    /// A real HTTP transport backed by reqwest.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }

        /// Build a transport whose requests time out after `timeout`.
        ///
        /// A hung upstream request otherwise stalls a whole sync pass; the
        /// request timeout is the only cancellation mechanism in the design.
        pub fn with_timeout(timeout: StdDuration) -> Result<Self, TransportError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| TransportError::Transport(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn get(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<HttpResponse, TransportError> {
            let fetch = || async {
                let mut builder = self.client.get(url);
                for (k, v) in headers {
                    builder = builder.header(k, v);
                }

                let resp = builder.send().await?;
                let status = resp.status().as_u16();

                let mut response_headers: HttpHeaders = Vec::new();
                for (name, value) in resp.headers().iter() {
                    response_headers.push((
                        name.as_str().to_string(),
                        value.to_str().unwrap_or_default().to_string(),
                    ));
                }

                let body = resp.bytes().await?.to_vec();

                Ok::<HttpResponse, reqwest::Error>(HttpResponse {
                    status,
                    headers: response_headers,
                    body,
                })
            };

            fetch
                .retry(transient_backoff())
                .when(|e: &reqwest::Error| e.is_timeout() || e.is_connect())
                .notify(|err, dur| {
                    tracing::debug!(
                        url,
                        retry_in = ?dur,
                        error = %err,
                        "transient transport error, retrying"
                    );
                })
                .await
                .map_err(|e| TransportError::Transport(e.to_string()))
        }
    }
}

// ---------- Test-only mock transport ----------

#[cfg(test)]
use std::collections::{HashMap, VecDeque};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// In-memory mock transport keyed by full request URL.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockTransportInner {
    routes: HashMap<String, VecDeque<HttpResponse>>,
    requests: Vec<String>,
}

#[cfg(test)]
impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a response for a URL.
    ///
    /// Multiple responses for the same URL are returned in FIFO order.
    pub(crate) fn push_response(&self, url: impl Into<String>, response: HttpResponse) {
        let mut inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");
        inner.routes.entry(url.into()).or_default().push_back(response);
    }

    /// Register a 200 response with a JSON body and no extra headers.
    pub(crate) fn push_json(&self, url: impl Into<String>, body: &str) {
        self.push_response(
            url,
            HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: body.as_bytes().to_vec(),
            },
        );
    }

    /// URLs of every request seen so far, in order.
    pub(crate) fn requests(&self) -> Vec<String> {
        let inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");
        inner.requests.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Transport for MockTransport {
    async fn get(
        &self,
        url: &str,
        _headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        let mut inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");
        inner.requests.push(url.to_string());

        match inner.routes.get_mut(url).and_then(|q| q.pop_front()) {
            Some(resp) => Ok(resp),
            None => Err(TransportError::NoMockResponse {
                url: url.to_string(),
            }),
        }
    }
}
