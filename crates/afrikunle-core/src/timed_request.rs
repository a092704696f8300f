//! One network call bounded by a deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ClientError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// How long an aborted transport gets to wind down before it is dropped.
const ABORT_GRACE: Duration = Duration::from_millis(250);

/// Issues requests through the platform transport under a deadline.
///
/// Whichever side wins, exactly one cancellation happens: the deadline timer
/// is dropped when the call settles first, and the transport's abort signal
/// fires when the deadline elapses first.
#[derive(Clone)]
pub struct TimedRequest {
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for TimedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedRequest").finish_non_exhaustive()
    }
}

impl TimedRequest {
    /// Wraps a platform transport.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Sends `request`, returning any settled response regardless of status.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Timeout` if `budget` elapses first, or the
    /// transport's error if the call fails.
    pub async fn send_raw(
        &self,
        request: HttpRequest,
        budget: Duration,
    ) -> Result<HttpResponse, ClientError> {
        let url = request.url.clone();
        let abort = CancellationToken::new();
        let call = self.transport.execute(request, abort.clone());
        tokio::pin!(call);

        tokio::select! {
            result = &mut call => result,
            () = tokio::time::sleep(budget) => {
                debug!(%url, ?budget, "request deadline elapsed, aborting");
                abort.cancel();
                let _ = tokio::time::timeout(ABORT_GRACE, &mut call).await;
                Err(ClientError::Timeout)
            }
        }
    }

    /// Sends `request` and treats non-2xx statuses as failures.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` for non-2xx statuses, plus everything
    /// `send_raw` returns.
    pub async fn send(
        &self,
        request: HttpRequest,
        budget: Duration,
    ) -> Result<HttpResponse, ClientError> {
        let response = self.send_raw(request, budget).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(ClientError::Http(response.status))
        }
    }
}
