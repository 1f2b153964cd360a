//! HTTP transport used for token exchange
//!
//! The session only needs one capability from the network: POST a
//! form-encoded body and read the reply. `Transport` captures that so the
//! session can be driven by `reqwest` in production and by an in-memory
//! fake in tests.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use tracing::debug;

use crate::constants::DEFAULT_TIMEOUT;
use crate::error::{BoxError, Error, Result};

/// Boxed future returned by `Transport` methods (keeps the trait dyn-compatible).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Reply to a form POST.
///
/// The body is read eagerly; a failed read is kept so the classifier can
/// report it against the status code.
#[derive(Debug)]
pub struct FormResponse {
    pub status: StatusCode,
    pub body: std::result::Result<Bytes, BoxError>,
}

impl FormResponse {
    /// Build a response from a status and a fully-read body.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: Ok(body.into()),
        }
    }
}

/// Capability to issue a form-encoded POST.
///
/// Implementations must return `Err(Error::Transport(_))` only for failures
/// to complete the exchange (connect, TLS, timeout). Any HTTP status,
/// including 4xx/5xx, is a successful transport result.
pub trait Transport: Send + Sync {
    /// POST `form` to `url` as `application/x-www-form-urlencoded`.
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        form: &'a [(&'a str, &'a str)],
    ) -> BoxFuture<'a, Result<FormResponse>>;

    /// Request timeout enforced by this transport.
    fn timeout(&self) -> Duration;
}

/// `reqwest`-backed transport with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(Box::new(e)))?;
        Ok(Self { client, timeout })
    }

    /// The underlying client, for issuing authenticated API requests with
    /// the same connection pool.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Transport for HttpTransport {
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        form: &'a [(&'a str, &'a str)],
    ) -> BoxFuture<'a, Result<FormResponse>> {
        Box::pin(async move {
            let response = self
                .client
                .post(url)
                .form(form)
                .send()
                .await
                .map_err(|e| Error::Transport(Box::new(e)))?;

            let status = response.status();
            debug!(url, status = status.as_u16(), "form POST completed");
            let body = response.bytes().await.map_err(|e| Box::new(e) as BoxError);
            Ok(FormResponse { status, body })
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
