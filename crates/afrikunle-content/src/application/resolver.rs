//! Endpoint resolution: probe candidate routes until one yields a usable
//! payload.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use afrikunle_core::error::ClientError;
use afrikunle_core::timed_request::TimedRequest;
use afrikunle_core::transport::HttpRequest;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::domain::endpoints::{EndpointCatalog, ResourceKind, ResourceParams};

/// Per-candidate deadline.
pub const CANDIDATE_BUDGET: Duration = Duration::from_millis(8000);

/// A payload that passed the resource's validity check.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// The usable payload.
    pub payload: Value,
    /// The candidate URL that produced it.
    pub source_endpoint: String,
}

/// Outcome of one resolution cycle.
pub type FetchOutcome = Result<Resolved, ClientError>;

/// Probes candidate endpoints strictly in order.
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    timed: TimedRequest,
    catalog: EndpointCatalog,
    budget: Duration,
}

impl EndpointResolver {
    /// Creates a resolver with the default per-candidate budget.
    #[must_use]
    pub fn new(timed: TimedRequest, catalog: EndpointCatalog) -> Self {
        Self::with_budget(timed, catalog, CANDIDATE_BUDGET)
    }

    /// Creates a resolver with a custom per-candidate budget.
    #[must_use]
    pub fn with_budget(timed: TimedRequest, catalog: EndpointCatalog, budget: Duration) -> Self {
        Self {
            timed,
            catalog,
            budget,
        }
    }

    /// The catalog this resolver probes.
    #[must_use]
    pub fn catalog(&self) -> &EndpointCatalog {
        &self.catalog
    }

    /// Resolves `kind` by probing every candidate in order, one at a time,
    /// stopping at the first usable payload.
    ///
    /// # Errors
    ///
    /// When every candidate fails: the shared error if all failed
    /// identically, `ClientError::EmptyOrMalformed` otherwise.
    #[instrument(skip(self), fields(locale = %params.locale))]
    pub async fn resolve(&self, kind: ResourceKind, params: &ResourceParams) -> FetchOutcome {
        let candidates = self.catalog.candidates(kind, params);
        let mut failures = Vec::with_capacity(candidates.len());

        for endpoint in candidates {
            let attempt = match self.timed.send(HttpRequest::get(&endpoint), self.budget).await {
                Ok(response) => response.json().and_then(|payload| {
                    let payload = kind.narrow(payload, params);
                    if kind.accepts(&payload) {
                        Ok(payload)
                    } else {
                        Err(ClientError::EmptyOrMalformed)
                    }
                }),
                Err(e) => Err(e),
            };

            match attempt {
                Ok(payload) => {
                    info!(%endpoint, "candidate resolved");
                    return Ok(Resolved {
                        payload,
                        source_endpoint: endpoint,
                    });
                }
                Err(e) => {
                    debug!(%endpoint, error = %e, "candidate failed");
                    failures.push(e);
                }
            }
        }

        Err(consolidate(failures))
    }
}

fn consolidate(failures: Vec<ClientError>) -> ClientError {
    let mut failures = failures.into_iter();
    match failures.next() {
        Some(first) if failures.all(|e| e == first) => first,
        _ => ClientError::EmptyOrMalformed,
    }
}

/// Hands out resolution tokens and tells whether one is still the latest.
///
/// A resolution publishes only if its token is current at publish time, so
/// a slow answer for an earlier request can never overwrite a newer one.
#[derive(Debug, Default)]
pub struct ResolutionGate {
    latest: AtomicU64,
}

impl ResolutionGate {
    /// Creates a gate with no resolution issued yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new token, superseding every earlier one.
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `token` is the most recently issued.
    #[must_use]
    pub fn is_current(&self, token: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == token
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use afrikunle_core::error::ClientError;
    use afrikunle_test_support::{Reply, ScriptedTransport};
    use serde_json::json;

    use super::*;
    use crate::domain::endpoints::EndpointCatalog;
    use crate::domain::lesson::LessonId;

    const BASE: &str = "http://api.test";
    const SINGULAR: &str = "http://api.test/api/lesson/1?lang=en";
    const PLURAL: &str = "http://api.test/api/lessons/1?lang=en";
    const LIST: &str = "http://api.test/api/lessons?lang=en";
    const NO_ID: &str = "http://api.test/api/lesson?lang=en";

    fn resolver(transport: &Arc<ScriptedTransport>) -> EndpointResolver {
        EndpointResolver::new(
            TimedRequest::new(transport.clone()),
            EndpointCatalog::new(BASE),
        )
    }

    fn lesson_params() -> ResourceParams {
        ResourceParams::lesson(&LessonId::Number(1), "en")
    }

    #[tokio::test]
    async fn test_first_success_short_circuits_later_candidates() {
        // Arrange
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(SINGULAR, Reply::empty(404))
                .route(PLURAL, Reply::ok(&json!({ "id": 1, "title": "Intro" })))
                .route(LIST, Reply::ok(&json!([{ "id": 1, "title": "Other" }]))),
        );

        // Act
        let resolved = resolver(&transport)
            .resolve(ResourceKind::Lesson, &lesson_params())
            .await
            .unwrap();

        // Assert
        assert_eq!(resolved.source_endpoint, PLURAL);
        assert_eq!(resolved.payload["title"], "Intro");
        assert_eq!(transport.called_urls(), vec![SINGULAR, PLURAL]);
    }

    #[tokio::test]
    async fn test_every_candidate_tried_once_in_order_before_failing() {
        // Arrange: mixed failures, including a 2xx that is semantically empty.
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(SINGULAR, Reply::empty(404))
                .route(PLURAL, Reply::ok(&json!({})))
                .route(LIST, Reply::ok(&json!([])))
                .route(NO_ID, Reply::NetworkError("connection reset".into())),
        );

        // Act
        let result = resolver(&transport)
            .resolve(ResourceKind::Lesson, &lesson_params())
            .await;

        // Assert
        assert_eq!(result, Err(ClientError::EmptyOrMalformed));
        assert_eq!(transport.called_urls(), vec![SINGULAR, PLURAL, LIST, NO_ID]);
    }

    #[tokio::test]
    async fn test_identical_failures_surface_the_underlying_reason() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(SINGULAR, Reply::empty(500))
                .route(PLURAL, Reply::empty(500))
                .route(LIST, Reply::empty(500))
                .route(NO_ID, Reply::empty(500)),
        );

        let result = resolver(&transport)
            .resolve(ResourceKind::Lesson, &lesson_params())
            .await;

        assert_eq!(result, Err(ClientError::Http(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_candidate_times_out_and_next_is_tried() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(SINGULAR, Reply::Hang)
                .route(PLURAL, Reply::ok(&json!({ "title": "Intro" }))),
        );

        let resolved = resolver(&transport)
            .resolve(ResourceKind::Lesson, &lesson_params())
            .await
            .unwrap();

        assert_eq!(resolved.source_endpoint, PLURAL);
        assert_eq!(transport.aborted_count(), 1);
    }

    #[tokio::test]
    async fn test_list_candidate_narrows_to_requested_id() {
        let transport = Arc::new(
            ScriptedTransport::new().route(
                LIST,
                Reply::ok(&json!([{ "id": 2, "title": "Two" }, { "id": 1, "title": "One" }])),
            ),
        );

        let resolved = resolver(&transport)
            .resolve(ResourceKind::Lesson, &lesson_params())
            .await
            .unwrap();

        assert_eq!(resolved.source_endpoint, LIST);
        assert_eq!(resolved.payload["title"], "One");
    }

    #[tokio::test]
    async fn test_list_without_requested_id_is_not_served_as_that_lesson() {
        // Arrange
        let params = ResourceParams::lesson(&LessonId::Number(99), "en");
        let transport = Arc::new(
            ScriptedTransport::new()
                .route("http://api.test/api/lesson/99?lang=en", Reply::empty(404))
                .route("http://api.test/api/lessons/99?lang=en", Reply::empty(404))
                .route(LIST, Reply::ok(&json!([{ "id": 1, "title": "Intro to Python" }])))
                .route(NO_ID, Reply::empty(404)),
        );

        // Act
        let result = resolver(&transport).resolve(ResourceKind::Lesson, &params).await;

        // Assert
        assert_eq!(result, Err(ClientError::EmptyOrMalformed));
        assert_eq!(transport.called_urls().len(), 4);
    }

    #[tokio::test]
    async fn test_configured_order_is_followed() {
        use crate::domain::endpoints::CandidateTemplate;

        let transport = Arc::new(
            ScriptedTransport::new()
                .route(NO_ID, Reply::ok(&json!({ "title": "A" })))
                .route(SINGULAR, Reply::ok(&json!({ "title": "B" }))),
        );
        let catalog = EndpointCatalog::with_lesson_candidates(
            BASE,
            vec![
                CandidateTemplate::new("{base}/api/lesson?lang={locale}"),
                CandidateTemplate::new("{base}/api/lesson/{id}?lang={locale}"),
            ],
        );
        let resolver = EndpointResolver::with_budget(
            TimedRequest::new(transport.clone()),
            catalog,
            Duration::from_secs(1),
        );

        let resolved = resolver
            .resolve(ResourceKind::Lesson, &lesson_params())
            .await
            .unwrap();

        assert_eq!(resolved.payload["title"], "A");
        assert_eq!(transport.called_urls(), vec![NO_ID]);
    }

    #[test]
    fn test_gate_only_latest_token_is_current() {
        let gate = ResolutionGate::new();

        let first = gate.issue();
        let second = gate.issue();

        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
        assert!(second > first);
    }
}
