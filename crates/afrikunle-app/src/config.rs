//! Layered configuration: built-in defaults, then an optional YAML file,
//! then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use afrikunle_content::domain::endpoints::DEFAULT_LESSON_CANDIDATES;
use serde::Deserialize;

use crate::error::AppError;

/// Environment variable naming the YAML file.
pub const CONFIG_PATH_ENV: &str = "AFRIKUNLE_CONFIG";

/// Which speech engine to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    /// Prints utterances and simulates playback time.
    #[default]
    Console,
    /// Speaks through the `espeak-ng` binary.
    Espeak,
}

impl std::str::FromStr for SpeechBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "espeak" | "espeak-ng" => Ok(Self::Espeak),
            other => Err(AppError::Config(format!(
                "unknown speech backend {other:?} (expected console or espeak)"
            ))),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Backend base URL.
    pub api_url: String,
    /// Per-request deadline, also the per-candidate budget.
    pub request_timeout_ms: u64,
    /// Health poll interval.
    pub health_interval_ms: u64,
    /// Deadline of a single health poll.
    pub health_timeout_ms: u64,
    /// JSON file backing the local cache.
    pub cache_path: PathBuf,
    /// How long startup waits for cached values.
    pub cache_grace_ms: u64,
    /// Speech engine.
    pub speech_backend: SpeechBackend,
    /// Delay between narration stages.
    pub narration_stage_delay_ms: u64,
    /// Total attempts for a code run facing transient failures.
    pub run_attempts: u32,
    /// Lesson candidate URL templates, in probing order.
    pub lesson_candidates: Vec<String>,
    /// Locales tried, in order, when a field lacks the requested one.
    pub locale_fallback: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5001".to_owned(),
            request_timeout_ms: 8000,
            health_interval_ms: 8000,
            health_timeout_ms: 3000,
            cache_path: PathBuf::from("afrikunle-cache.json"),
            cache_grace_ms: 1500,
            speech_backend: SpeechBackend::Console,
            narration_stage_delay_ms: 3500,
            run_attempts: 2,
            lesson_candidates: DEFAULT_LESSON_CANDIDATES
                .iter()
                .map(|t| (*t).to_owned())
                .collect(),
            locale_fallback: vec!["en".to_owned()],
        }
    }
}

impl AppConfig {
    /// Loads configuration from an optional file and an environment lookup.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the file cannot be read or parsed, or a value is
    /// invalid.
    pub fn from_sources(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let mut config = match path {
            Some(path) => Self::from_yaml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a YAML document; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigFile` for malformed YAML or unknown keys.
    pub fn from_yaml(yaml: &str) -> Result<Self, AppError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), AppError> {
        let present = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = present("AFRIKUNLE_API_URL").or_else(|| present("EXPO_PUBLIC_API_URL")) {
            self.api_url = url;
        }
        if let Some(raw) = present("AFRIKUNLE_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_millis("AFRIKUNLE_REQUEST_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = present("AFRIKUNLE_HEALTH_INTERVAL_MS") {
            self.health_interval_ms = parse_millis("AFRIKUNLE_HEALTH_INTERVAL_MS", &raw)?;
        }
        if let Some(path) = present("AFRIKUNLE_CACHE_PATH") {
            self.cache_path = PathBuf::from(path);
        }
        if let Some(raw) = present("AFRIKUNLE_SPEECH") {
            self.speech_backend = raw.parse()?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), AppError> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "api_url must be an http(s) URL, got {url:?}"
            )));
        }
        for (name, value) in [
            ("request_timeout_ms", self.request_timeout_ms),
            ("health_interval_ms", self.health_interval_ms),
            ("health_timeout_ms", self.health_timeout_ms),
            ("cache_grace_ms", self.cache_grace_ms),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!("{name} must be positive")));
            }
        }
        if self.run_attempts == 0 {
            return Err(AppError::Config("run_attempts must be at least 1".to_owned()));
        }
        if self.lesson_candidates.is_empty() {
            return Err(AppError::Config(
                "lesson_candidates must list at least one template".to_owned(),
            ));
        }
        if let Some(bad) = self
            .lesson_candidates
            .iter()
            .find(|t| !t.contains("{base}"))
        {
            return Err(AppError::Config(format!(
                "lesson candidate {bad:?} has no {{base}} placeholder"
            )));
        }
        Ok(())
    }

    /// Per-request deadline.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Health poll interval.
    #[must_use]
    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }

    /// Health poll deadline.
    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    /// Cache startup grace period.
    #[must_use]
    pub fn cache_grace(&self) -> Duration {
        Duration::from_millis(self.cache_grace_ms)
    }

    /// Delay between narration stages.
    #[must_use]
    pub fn narration_stage_delay(&self) -> Duration {
        Duration::from_millis(self.narration_stage_delay_ms)
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64, AppError> {
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{key} must be a whole number of milliseconds: {e}")))
}
