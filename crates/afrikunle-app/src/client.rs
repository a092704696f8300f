//! The client handle screens hold.
//!
//! `AfrikunleClient` is built once from an [`AppConfig`] and a [`Platform`]
//! and owns every service. Nothing here is global: tests build as many
//! clients as they like, each over its own fakes.

use std::fmt;
use std::sync::Arc;

use afrikunle_cache::file_store::FileStore;
use afrikunle_cache::local_cache::LocalCache;
use afrikunle_cache::preferences::{self, Preferences, Theme};
use afrikunle_content::application::code_runner::{CodeRun, CodeRunner};
use afrikunle_content::application::lesson_loader::LessonLoader;
use afrikunle_content::application::lesson_service::{
    LessonFetch, LessonListFetch, LessonService,
};
use afrikunle_content::application::resolver::EndpointResolver;
use afrikunle_content::domain::endpoints::{CandidateTemplate, EndpointCatalog};
use afrikunle_content::domain::lesson::{LessonContent, LessonId, Level};
use afrikunle_content::domain::normalizer::LocalePolicy;
use afrikunle_core::clock::{Clock, SystemClock};
use afrikunle_core::error::ClientError;
use afrikunle_core::speech::SpeechEngine;
use afrikunle_core::storage::KeyValueStore;
use afrikunle_core::timed_request::TimedRequest;
use afrikunle_core::transport::HttpTransport;
use afrikunle_health::{HealthHandle, HealthMonitor};
use afrikunle_narration::application::controller::{
    NarrationController, NarrationRequest, SpeakOutcome,
};
use afrikunle_narration::domain::script::{self, LessonScript};
use afrikunle_transport::ReqwestTransport;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::speech;

/// The platform capabilities a client runs on.
pub struct Platform {
    /// HTTP transport.
    pub transport: Arc<dyn HttpTransport>,
    /// Device-local key/value storage.
    pub store: Arc<dyn KeyValueStore>,
    /// Speech synthesis.
    pub speech: Arc<dyn SpeechEngine>,
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}

impl Platform {
    /// The production platform: `reqwest`, a JSON cache file and the
    /// configured speech backend.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Client` if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self {
            transport: Arc::new(ReqwestTransport::new()?),
            store: Arc::new(FileStore::new(&config.cache_path)),
            speech: speech::engine_for(config.speech_backend),
            clock: Arc::new(SystemClock),
        })
    }
}

/// Lesson fetching, code runs, narration, health and preferences over one
/// injected platform.
pub struct AfrikunleClient {
    config: AppConfig,
    cache: Arc<LocalCache>,
    lessons: Arc<LessonService>,
    runner: CodeRunner,
    narration: NarrationController,
    monitor: HealthMonitor,
    device_language: String,
}

impl fmt::Debug for AfrikunleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfrikunleClient")
            .field("api_url", &self.config.api_url)
            .field("device_language", &self.device_language)
            .finish_non_exhaustive()
    }
}

impl AfrikunleClient {
    /// Builds a client over the production platform.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the platform cannot be built.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        let platform = Platform::from_config(&config)?;
        Ok(Self::with_platform(config, platform).await)
    }

    /// Builds a client over `platform`. Waits for the cache startup load,
    /// bounded by `cache_grace_ms`.
    pub async fn with_platform(config: AppConfig, platform: Platform) -> Self {
        let cache = Arc::new(LocalCache::open(platform.store, config.cache_grace()).await);
        let timed = TimedRequest::new(Arc::clone(&platform.transport));

        let candidates = config
            .lesson_candidates
            .iter()
            .map(CandidateTemplate::new)
            .collect();
        let catalog = EndpointCatalog::with_lesson_candidates(&config.api_url, candidates);
        let resolver = EndpointResolver::with_budget(timed.clone(), catalog, config.request_timeout());
        let lessons = Arc::new(LessonService::new(
            resolver,
            Arc::clone(&cache),
            LocalePolicy::new(config.locale_fallback.clone()),
        ));

        let runner = CodeRunner::new(timed, Arc::clone(&cache), &config.api_url)
            .with_budget(config.request_timeout())
            .with_attempts(config.run_attempts);
        let narration =
            NarrationController::new(platform.speech).with_stage_delay(config.narration_stage_delay());
        let monitor = HealthMonitor::new(platform.transport, platform.clock)
            .with_interval(config.health_interval())
            .with_probe_timeout(config.health_timeout());

        info!(api_url = %config.api_url, "client ready");
        Self {
            config,
            cache,
            lessons,
            runner,
            narration,
            monitor,
            device_language: preferences::device_language(),
        }
    }

    /// Overrides the inferred device language used as the locale default.
    #[must_use]
    pub fn with_device_language(mut self, language: impl Into<String>) -> Self {
        self.device_language = language.into();
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Fetches a lesson, falling back to the last good copy.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` when every candidate failed and nothing is
    /// cached for `(id, locale)`.
    pub async fn fetch_lesson(&self, id: &LessonId, locale: &str) -> Result<LessonFetch, ClientError> {
        self.lessons.fetch_lesson(id, locale).await
    }

    /// Lists lessons, optionally keeping one level.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` when the list route failed and nothing is
    /// cached for `locale`.
    pub async fn list_lessons(
        &self,
        locale: &str,
        level: Option<&Level>,
    ) -> Result<LessonListFetch, ClientError> {
        self.lessons.list_lessons(locale, level).await
    }

    /// A lesson slot for one screen. Only its latest load publishes.
    #[must_use]
    pub fn lesson_loader(&self) -> LessonLoader {
        LessonLoader::new(Arc::clone(&self.lessons))
    }

    /// Runs a code snippet on the backend.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` when the run could not be delivered or the
    /// backend answered with an unexpected status.
    pub async fn run_code(&self, code: &str) -> Result<CodeRun, ClientError> {
        self.runner.run_code(code).await
    }

    /// Speaks `text`, preempting anything already playing. `rate` defaults
    /// to the stored preference.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::VoiceUnavailable` when no voice can be used.
    pub async fn speak(
        &self,
        text: &str,
        locale: &str,
        rate: Option<f32>,
    ) -> Result<SpeakOutcome, ClientError> {
        let rate = rate.unwrap_or_else(|| self.preferences().speech_rate);
        self.narration.speak(text, locale, rate).await
    }

    /// Silences narration. A no-op when nothing is playing.
    pub async fn stop_speaking(&self) {
        self.narration.stop().await;
    }

    /// Greets the user, then reads the opening of the lesson.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::VoiceUnavailable` when no voice can be used.
    #[instrument(skip(self, lesson), fields(title = %lesson.title))]
    pub async fn narrate_lesson(
        &self,
        lesson: &LessonContent,
        locale: &str,
    ) -> Result<SpeakOutcome, ClientError> {
        let prefs = self.preferences();
        let script = LessonScript::new(&prefs.user_name, &lesson.title, &lesson.body, locale);
        self.narration
            .narrate_lesson(&script, locale, prefs.speech_rate)
            .await
    }

    /// Reads the whole lesson: title, then body.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::VoiceUnavailable` when no voice can be used.
    pub async fn read_lesson(
        &self,
        lesson: &LessonContent,
        locale: &str,
    ) -> Result<SpeakOutcome, ClientError> {
        let text = script::full_reading(&lesson.title, &lesson.body);
        let rate = self.preferences().speech_rate;
        self.narration
            .speak_request(NarrationRequest::new(text, locale, rate))
            .await
    }

    /// The narration controller, for state subscriptions.
    #[must_use]
    pub fn narration(&self) -> &NarrationController {
        &self.narration
    }

    /// Starts polling the configured backend's health route.
    #[must_use]
    pub fn watch_health(&self) -> HealthHandle {
        self.monitor.start(&self.config.api_url)
    }

    /// Starts polling the health route under `url`.
    #[must_use]
    pub fn watch_health_at(&self, url: &str) -> HealthHandle {
        self.monitor.start(url)
    }

    /// Stored preferences with defaults applied.
    #[must_use]
    pub fn preferences(&self) -> Preferences {
        self.cache.preferences(&self.device_language)
    }

    /// Persists the content locale.
    pub fn set_lang(&self, lang: &str) {
        self.cache.set_lang(lang);
    }

    /// Persists the theme.
    pub fn set_theme(&self, theme: Theme) {
        self.cache.set_theme(theme);
    }

    /// Persists the narration rate.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for rates that are not finite and positive.
    pub fn set_speech_rate(&self, rate: f32) -> Result<(), AppError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(AppError::Config(format!("speech rate must be positive, got {rate}")));
        }
        self.cache.set_speech_rate(rate);
        Ok(())
    }

    /// Persists the display name.
    pub fn set_user_name(&self, name: &str) {
        self.cache.set_user_name(name);
    }

    /// Stops narration and flushes pending cache writes.
    pub async fn shutdown(self) {
        self.narration.stop().await;
        self.cache.close().await;
        info!("client shut down");
    }
}
