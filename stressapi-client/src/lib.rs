use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use stressapi_common::Method;
use thiserror::Error;
use tracing::debug;

pub mod classify;

pub use classify::{classify, classify_error, shorten_message, Classified, MAX_MESSAGE_WIDTH};
pub use reqwest::Url;

/// Redirects followed before a request is reported as code 904.
pub const MAX_REDIRECTS: usize = 10;

/// A fully resolved request, built by a worker for every call.
#[derive(Debug, Clone)]
pub struct RequestParts<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: &'a [(String, String)],
    pub body: &'a [u8],
    pub timeout: Duration,
}

/// Status and first body line of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

/// A request that produced no HTTP status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Failure reported by a non-reqwest client; classified from its text.
    #[error("{0}")]
    Message(String),
}

/// Sends one request. Implementations must be shareable across worker threads.
pub trait RequestClient: Send + Sync {
    fn send(&self, request: &RequestParts<'_>) -> Result<Reply, TransportError>;
}

/// Blocking reqwest client shared by every worker of a run.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http_client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, TransportError> {
        let http_client = reqwest::blocking::Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;
        debug!("HTTP client ready, following up to {MAX_REDIRECTS} redirects");
        Ok(Self { http_client })
    }
}

impl RequestClient for HttpClient {
    fn send(&self, request: &RequestParts<'_>) -> Result<Reply, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .http_client
            .request(method, request.url)
            .timeout(request.timeout);
        for (name, value) in request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.to_vec());
        }

        let response = builder.send()?;
        let status = response.status();

        // 202 and 204 carry nothing worth reading.
        if status == StatusCode::ACCEPTED || status == StatusCode::NO_CONTENT {
            return Ok(Reply { status: status.as_u16(), body: String::new() });
        }

        let text = response.text()?;
        let body = text.lines().next().unwrap_or_default().trim().to_string();
        Ok(Reply { status: status.as_u16(), body })
    }
}

/// Returns `true` if `name: value` can be sent as an HTTP header.
pub fn is_valid_header(name: &str, value: &str) -> bool {
    HeaderName::from_bytes(name.as_bytes()).is_ok() && HeaderValue::from_str(value).is_ok()
}
