//! Lesson retrieval with last-good fallback.
//!
//! Live resolution goes through the endpoint resolver and the normalizer;
//! every success is written to the local cache, and every total failure is
//! answered from it when a copy exists.

use std::sync::Arc;

use afrikunle_cache::keys::CacheKey;
use afrikunle_cache::local_cache::LocalCache;
use afrikunle_core::error::ClientError;
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::application::resolver::EndpointResolver;
use crate::domain::endpoints::{ResourceKind, ResourceParams};
use crate::domain::lesson::{LessonContent, LessonId, Level};
use crate::domain::normalizer::{self, LocalePolicy};

/// Where a fetched value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Live from the backend.
    Network {
        /// Candidate URL that answered.
        endpoint: String,
    },
    /// The last-good cached copy.
    Cache,
}

/// A lesson and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonFetch {
    /// The normalized lesson.
    pub lesson: LessonContent,
    /// Its origin.
    pub origin: Origin,
}

/// A lesson list and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonListFetch {
    /// Lessons that passed the level filter, in backend order.
    pub lessons: Vec<LessonContent>,
    /// Their origin.
    pub origin: Origin,
}

/// Fetches lessons, falling back to the local cache.
#[derive(Debug)]
pub struct LessonService {
    resolver: EndpointResolver,
    cache: Arc<LocalCache>,
    policy: LocalePolicy,
}

impl LessonService {
    /// Creates the service.
    #[must_use]
    pub fn new(resolver: EndpointResolver, cache: Arc<LocalCache>, policy: LocalePolicy) -> Self {
        Self {
            resolver,
            cache,
            policy,
        }
    }

    /// Fetches lesson `id` in `locale`.
    ///
    /// # Errors
    ///
    /// Returns the resolver's consolidated error when every candidate failed
    /// and no cached copy exists for `(id, locale)`.
    pub async fn fetch_lesson(
        &self,
        id: &LessonId,
        locale: &str,
    ) -> Result<LessonFetch, ClientError> {
        let correlation_id = Uuid::new_v4();
        let span = info_span!("fetch_lesson", %id, locale, %correlation_id);
        self.fetch_lesson_inner(id, locale).instrument(span).await
    }

    async fn fetch_lesson_inner(
        &self,
        id: &LessonId,
        locale: &str,
    ) -> Result<LessonFetch, ClientError> {
        let key = CacheKey::lesson(id, locale);
        let live = self
            .resolver
            .resolve(ResourceKind::Lesson, &ResourceParams::lesson(id, locale))
            .await
            .and_then(|resolved| {
                let mut lesson = normalizer::normalize(&resolved.payload, locale, &self.policy)?;
                lesson.id.get_or_insert_with(|| id.clone());
                Ok((lesson, resolved.source_endpoint))
            });

        match live {
            Ok((lesson, endpoint)) => {
                self.remember(&key, &lesson);
                info!(%endpoint, "lesson fetched");
                Ok(LessonFetch {
                    lesson,
                    origin: Origin::Network { endpoint },
                })
            }
            Err(error) => match self.recall::<LessonContent>(&key).await {
                Some(lesson) => {
                    warn!(error = %error, "lesson fetch failed, serving cached copy");
                    Ok(LessonFetch {
                        lesson,
                        origin: Origin::Cache,
                    })
                }
                None => {
                    warn!(error = %error, "lesson fetch failed with no cached copy");
                    Err(error)
                }
            },
        }
    }

    /// Lists lessons in `locale`, keeping those at `level` plus those that
    /// carry no level. `None` keeps everything.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error when the list route failed and no cached
    /// list exists for `locale`.
    pub async fn list_lessons(
        &self,
        locale: &str,
        level: Option<&Level>,
    ) -> Result<LessonListFetch, ClientError> {
        let correlation_id = Uuid::new_v4();
        let span = info_span!("list_lessons", locale, ?level, %correlation_id);
        async {
            let key = CacheKey::lesson_list(locale);
            let live = self
                .resolver
                .resolve(ResourceKind::LessonList, &ResourceParams::list(locale))
                .await;

            let (lessons, origin) = match live {
                Ok(resolved) => {
                    let lessons = self.normalize_list(&resolved.payload, locale);
                    self.remember(&key, &lessons);
                    debug!(count = lessons.len(), "lesson list fetched");
                    let origin = Origin::Network {
                        endpoint: resolved.source_endpoint,
                    };
                    (lessons, origin)
                }
                Err(error) => match self.recall::<Vec<LessonContent>>(&key).await {
                    Some(lessons) => {
                        warn!(error = %error, "lesson list failed, serving cached copy");
                        (lessons, Origin::Cache)
                    }
                    None => return Err(error),
                },
            };

            Ok(LessonListFetch {
                lessons: filter_by_level(lessons, level),
                origin,
            })
        }
        .instrument(span)
        .await
    }

    fn normalize_list(&self, payload: &Value, locale: &str) -> Vec<LessonContent> {
        payload
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| normalizer::normalize(item, locale, &self.policy).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn remember<T: serde::Serialize>(&self, key: &CacheKey, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.cache.set(key, json),
            Err(e) => warn!(%key, error = %e, "could not serialize value for cache"),
        }
    }

    async fn recall<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = self.cache.load(key).await?;
        serde_json::from_str(&raw)
            .inspect_err(|e| warn!(%key, error = %e, "ignoring unreadable cache entry"))
            .ok()
    }
}

fn filter_by_level(lessons: Vec<LessonContent>, level: Option<&Level>) -> Vec<LessonContent> {
    match level {
        None => lessons,
        Some(wanted) => lessons
            .into_iter()
            .filter(|lesson| lesson.level.as_ref().is_none_or(|l| l.matches(wanted)))
            .collect(),
    }
}
