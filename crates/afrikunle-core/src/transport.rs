//! HTTP transport abstraction.
//!
//! The platform owns the actual network stack. The orchestrator only issues
//! one request at a time through this trait and hands it an abort signal.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

/// HTTP method used by the backend contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST` with a JSON body.
    Post,
}

/// A single outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// JSON body, sent only for `POST`.
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Builds a `GET` request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    /// Builds a `POST` request with a JSON body.
    #[must_use]
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// A settled response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::EmptyOrMalformed` if the body is empty or is not
    /// valid JSON.
    pub fn json(&self) -> Result<serde_json::Value, ClientError> {
        if self.body.is_empty() {
            return Err(ClientError::EmptyOrMalformed);
        }
        serde_json::from_slice(&self.body).map_err(|_| ClientError::EmptyOrMalformed)
    }
}

/// Platform-provided HTTP primitive.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes one request.
    ///
    /// Implementations must stop work and return promptly once `abort` is
    /// cancelled. Any settled response is `Ok`, regardless of status.
    async fn execute(
        &self,
        request: HttpRequest,
        abort: CancellationToken,
    ) -> Result<HttpResponse, ClientError>;
}
