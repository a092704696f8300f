//! The per-screen lesson slot.
//!
//! A screen asks for `(id, locale)` and watches one state value. Several
//! loads may be in flight; only the most recently requested one publishes.

use std::sync::Arc;

use afrikunle_core::error::ClientError;
use tokio::sync::watch;
use tracing::debug;

use crate::application::lesson_service::{LessonFetch, LessonService};
use crate::application::resolver::ResolutionGate;
use crate::domain::lesson::LessonId;

/// What the screen currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LessonState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A load for `(id, locale)` is in flight.
    Loading {
        /// Requested lesson.
        id: LessonId,
        /// Requested locale.
        locale: String,
    },
    /// The lesson for `(id, locale)` is available.
    Ready {
        /// Requested lesson.
        id: LessonId,
        /// Requested locale.
        locale: String,
        /// The fetched lesson and its origin.
        fetch: LessonFetch,
    },
    /// Live retrieval and the cache both came up empty.
    Failed {
        /// Requested lesson.
        id: LessonId,
        /// Requested locale.
        locale: String,
        /// Consolidated failure.
        error: ClientError,
    },
}

/// Whether a finished load reached the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publication {
    /// The result became the current state.
    Published,
    /// A newer load superseded this one; its result was dropped.
    Discarded,
}

/// Loads lessons into a watched slot, discarding stale results.
#[derive(Debug)]
pub struct LessonLoader {
    service: Arc<LessonService>,
    gate: ResolutionGate,
    state: watch::Sender<LessonState>,
}

impl LessonLoader {
    /// Creates an idle loader.
    #[must_use]
    pub fn new(service: Arc<LessonService>) -> Self {
        Self {
            service,
            gate: ResolutionGate::new(),
            state: watch::Sender::new(LessonState::Idle),
        }
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LessonState> {
        self.state.subscribe()
    }

    /// The current state.
    #[must_use]
    pub fn current(&self) -> LessonState {
        self.state.borrow().clone()
    }

    /// Loads `(id, locale)`, superseding any load still in flight.
    pub async fn load(&self, id: LessonId, locale: &str) -> Publication {
        let token = self.gate.issue();
        self.publish(token, || LessonState::Loading {
            id: id.clone(),
            locale: locale.to_owned(),
        });

        let result = self.service.fetch_lesson(&id, locale).await;

        let locale = locale.to_owned();
        let published = self.publish(token, move || match result {
            Ok(fetch) => LessonState::Ready { id, locale, fetch },
            Err(error) => LessonState::Failed { id, locale, error },
        });
        if published == Publication::Discarded {
            debug!(token, "stale lesson load discarded");
        }
        published
    }

    /// Writes the next state only while `token` is current. The check and
    /// the write happen under the channel's lock, so a newer load cannot
    /// slip in between them.
    fn publish(&self, token: u64, next: impl FnOnce() -> LessonState) -> Publication {
        let modified = self.state.send_if_modified(|state| {
            if !self.gate.is_current(token) {
                return false;
            }
            *state = next();
            true
        });
        if modified {
            Publication::Published
        } else {
            Publication::Discarded
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use afrikunle_cache::local_cache::LocalCache;
    use afrikunle_core::error::ClientError;
    use afrikunle_core::timed_request::TimedRequest;
    use afrikunle_test_support::{MemoryStore, Reply, ScriptedTransport};
    use serde_json::json;

    use super::*;
    use crate::application::resolver::EndpointResolver;
    use crate::domain::endpoints::EndpointCatalog;
    use crate::domain::normalizer::LocalePolicy;

    const LESSON_1: &str = "http://api.test/api/lesson/1?lang=en";
    const LESSON_2: &str = "http://api.test/api/lesson/2?lang=en";

    async fn loader(transport: ScriptedTransport) -> LessonLoader {
        let resolver = EndpointResolver::new(
            TimedRequest::new(Arc::new(transport)),
            EndpointCatalog::new("http://api.test"),
        );
        let cache = LocalCache::open(Arc::new(MemoryStore::new()), Duration::from_millis(100)).await;
        LessonLoader::new(Arc::new(LessonService::new(
            resolver,
            Arc::new(cache),
            LocalePolicy::default(),
        )))
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_request_is_published() {
        // Arrange: lesson 1 answers slowly, lesson 2 answers at once.
        let transport = ScriptedTransport::new()
            .route_delayed(
                LESSON_1,
                Duration::from_secs(5),
                Reply::ok(&json!({ "id": 1, "title": "One" })),
            )
            .route(LESSON_2, Reply::ok(&json!({ "id": 2, "title": "Two" })));
        let loader = loader(transport).await;
        let mut updates = loader.subscribe();

        // Act
        let (first, second) = tokio::join!(loader.load(LessonId::Number(1), "en"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            loader.load(LessonId::Number(2), "en").await
        });

        // Assert
        assert_eq!(first, Publication::Discarded);
        assert_eq!(second, Publication::Published);
        match loader.current() {
            LessonState::Ready { id, fetch, .. } => {
                assert_eq!(id, LessonId::Number(2));
                assert_eq!(fetch.lesson.title, "Two");
            }
            other => panic!("expected Ready, got {other:?}"),
        }
        assert!(updates.has_changed().unwrap());
        assert!(matches!(
            &*updates.borrow_and_update(),
            LessonState::Ready { id: LessonId::Number(2), .. }
        ));
    }

    #[tokio::test]
    async fn test_repeat_request_for_same_pair_supersedes_earlier_one() {
        let loader = loader(
            ScriptedTransport::new().route(LESSON_1, Reply::ok(&json!({ "title": "One" }))),
        )
        .await;

        let stale = loader.gate.issue();
        let outcome = loader.load(LessonId::Number(1), "en").await;

        assert_eq!(outcome, Publication::Published);
        assert_eq!(
            loader.publish(stale, || LessonState::Idle),
            Publication::Discarded
        );
    }

    #[tokio::test]
    async fn test_total_failure_is_published_as_failed() {
        let loader = loader(ScriptedTransport::new()).await;

        let outcome = loader.load(LessonId::Number(1), "en").await;

        assert_eq!(outcome, Publication::Published);
        assert_eq!(
            loader.current(),
            LessonState::Failed {
                id: LessonId::Number(1),
                locale: "en".to_owned(),
                error: ClientError::EmptyOrMalformed,
            }
        );
    }
}
