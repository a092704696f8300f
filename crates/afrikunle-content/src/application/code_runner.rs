//! Sandboxed code runs against the backend's fixed run route.

use std::sync::Arc;
use std::time::Duration;

use afrikunle_cache::keys::CacheKey;
use afrikunle_cache::local_cache::LocalCache;
use afrikunle_core::error::ClientError;
use afrikunle_core::timed_request::TimedRequest;
use afrikunle_core::transport::{HttpRequest, HttpResponse};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

/// Shown when a run succeeds without printing anything.
pub const SILENT_SUCCESS: &str = "Code ran successfully";

/// Default total attempts, counting the first.
pub const DEFAULT_ATTEMPTS: u32 = 2;

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeRun {
    /// Program output.
    Output(String),
    /// A failure the backend reported (blocked code, exception, ...).
    Error(String),
}

impl CodeRun {
    /// The text to display.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Output(text) | Self::Error(text) => text,
        }
    }
}

/// Posts code to `{base}/api/run`.
#[derive(Debug)]
pub struct CodeRunner {
    timed: TimedRequest,
    cache: Arc<LocalCache>,
    run_url: String,
    budget: Duration,
    attempts: u32,
}

impl CodeRunner {
    /// Creates a runner against `base_url`.
    #[must_use]
    pub fn new(timed: TimedRequest, cache: Arc<LocalCache>, base_url: &str) -> Self {
        Self {
            timed,
            cache,
            run_url: format!("{}/api/run", base_url.trim_end_matches('/')),
            budget: Duration::from_millis(8000),
            attempts: DEFAULT_ATTEMPTS,
        }
    }

    /// Sets the per-attempt deadline.
    #[must_use]
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Sets the total number of attempts for transient failures. At least one
    /// attempt is always made.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Runs `code`, remembering it as `lastCode` before sending and the
    /// displayed result as `lastOutput` afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` or `Network` once every attempt failed transiently,
    /// and `Http` for statuses that carry no run result.
    #[instrument(skip(self, code), fields(code_len = code.len()))]
    pub async fn run_code(&self, code: &str) -> Result<CodeRun, ClientError> {
        self.cache.set(&CacheKey::LastCode, code);

        let response = self.send_with_retry(code).await?;
        let run = interpret(&response)?;

        let failed = matches!(run, CodeRun::Error(_));
        info!(status = response.status, failed, "code run finished");
        self.cache.set(&CacheKey::LastOutput, run.text());
        Ok(run)
    }

    async fn send_with_retry(&self, code: &str) -> Result<HttpResponse, ClientError> {
        let mut attempt = 1;
        loop {
            let request = HttpRequest::post_json(&self.run_url, json!({ "code": code }));
            match self.timed.send_raw(request, self.budget).await {
                Err(e) if e.is_retryable() && attempt < self.attempts => {
                    warn!(attempt, error = %e, "code run failed, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

fn interpret(response: &HttpResponse) -> Result<CodeRun, ClientError> {
    let body = response.json().ok();
    let field = |name: &str| {
        body.as_ref()
            .and_then(|b| b.get(name))
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
    };

    if response.is_success() {
        Ok(field("output")
            .map(CodeRun::Output)
            .or_else(|| field("error").map(CodeRun::Error))
            .unwrap_or_else(|| CodeRun::Output(SILENT_SUCCESS.to_owned())))
    } else if (400..500).contains(&response.status) {
        field("error")
            .or_else(|| field("output"))
            .map(CodeRun::Error)
            .ok_or(ClientError::Http(response.status))
    } else {
        Err(ClientError::Http(response.status))
    }
}
