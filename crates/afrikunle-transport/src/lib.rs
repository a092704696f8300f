//! Afrikunle — platform transport.
//!
//! `HttpTransport` over `reqwest`. Deadlines belong to the caller; this layer
//! only honours the abort signal it is handed, dropping the in-flight request
//! as soon as the signal fires.

use afrikunle_core::error::ClientError;
use afrikunle_core::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("afrikunle/", env!("CARGO_PKG_VERSION"));

/// Transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with a fresh client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Network` if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Network(format!("http client init failed: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_error)?;
        trace!(url = %request.url, status, bytes = body.len(), "response received");

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn map_error(error: reqwest::Error) -> ClientError {
    if error.is_timeout() {
        ClientError::Timeout
    } else {
        ClientError::Network(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: HttpRequest,
        abort: CancellationToken,
    ) -> Result<HttpResponse, ClientError> {
        let url = request.url.clone();
        tokio::select! {
            result = self.perform(request) => result,
            () = abort.cancelled() => {
                debug!(%url, "request aborted");
                Err(ClientError::Network("request aborted".to_owned()))
            }
        }
    }
}
