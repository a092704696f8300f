//! Test transport — scripted `HttpTransport` implementation for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use afrikunle_core::error::ClientError;
use afrikunle_core::transport::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// What the scripted transport answers for one call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A settled response.
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw body.
        body: Vec<u8>,
    },
    /// A transport-level failure.
    NetworkError(String),
    /// Never settles; only an abort ends the call.
    Hang,
}

impl Reply {
    /// A 200 response with a JSON body.
    #[must_use]
    pub fn ok(body: &serde_json::Value) -> Self {
        Self::json(200, body)
    }

    /// A response with the given status and JSON body.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::Status {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    /// A response with the given status and an empty body.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::Status {
            status,
            body: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Step {
    delay: Duration,
    reply: Reply,
}

/// A transport that answers from per-URL scripts and records every call.
///
/// Each URL holds a queue of replies; the last one is repeated once the queue
/// drains. URLs without a script fail with a network error. Delays are
/// measured on the tokio clock, so tests can run with time paused.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<HttpRequest>>,
    aborted: AtomicUsize,
}

impl ScriptedTransport {
    /// Creates a transport with no scripted routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts an immediate reply for `url`.
    #[must_use]
    pub fn route(self, url: &str, reply: Reply) -> Self {
        self.route_delayed(url, Duration::ZERO, reply)
    }

    /// Scripts a reply for `url` that settles after `delay`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn route_delayed(self, url: &str, delay: Duration, reply: Reply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_owned())
            .or_default()
            .push_back(Step { delay, reply });
        self
    }

    /// Scripts consecutive immediate replies for `url`.
    #[must_use]
    pub fn sequence(self, url: &str, replies: Vec<Reply>) -> Self {
        replies
            .into_iter()
            .fold(self, |transport, reply| transport.route(url, reply))
    }

    /// Returns a snapshot of all requests received, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns the URLs of all requests received, in order.
    pub fn called_urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.url).collect()
    }

    /// Number of calls that ended because their abort signal fired.
    pub fn aborted_count(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }

    fn next_step(&self, url: &str) -> Step {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Step {
                delay: Duration::ZERO,
                reply: Reply::NetworkError(format!("no route scripted for {url}")),
            },
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(
        &self,
        request: HttpRequest,
        abort: CancellationToken,
    ) -> Result<HttpResponse, ClientError> {
        let step = self.next_step(&request.url);
        self.calls.lock().unwrap().push(request);

        let settled = async {
            tokio::time::sleep(step.delay).await;
            match step.reply {
                Reply::Status { status, body } => Ok(HttpResponse { status, body }),
                Reply::NetworkError(message) => Err(ClientError::Network(message)),
                Reply::Hang => std::future::pending().await,
            }
        };

        tokio::select! {
            result = settled => result,
            () = abort.cancelled() => {
                self.aborted.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::Network("request aborted".to_owned()))
            }
        }
    }
}
