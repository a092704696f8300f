//! Typed preference view over the cache.

use tracing::debug;

use crate::keys::CacheKey;
use crate::local_cache::LocalCache;

/// Default narration rate.
pub const DEFAULT_SPEECH_RATE: f32 = 0.95;

/// Default display name.
pub const DEFAULT_USER_NAME: &str = "Student";

/// Visual theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    /// Light theme.
    #[default]
    Light,
    /// Dark theme.
    Dark,
}

/// Preferences with built-in defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    /// Content locale.
    pub lang: String,
    /// Visual theme.
    pub theme: Theme,
    /// Narration playback rate.
    pub speech_rate: f32,
    /// Display name.
    pub user_name: String,
    /// Last code submitted to the runner.
    pub last_code: Option<String>,
    /// Last code-run output shown.
    pub last_output: Option<String>,
}

impl LocalCache {
    /// Builds the preference view, falling back to defaults for anything
    /// absent or unparseable. `device_language` is the locale default.
    #[must_use]
    pub fn preferences(&self, device_language: &str) -> Preferences {
        let speech_rate = self
            .get(&CacheKey::SpeechRate)
            .and_then(|raw| match raw.trim().parse::<f32>() {
                Ok(rate) if rate.is_finite() && rate > 0.0 => Some(rate),
                _ => {
                    debug!(%raw, "ignoring invalid stored speech rate");
                    None
                }
            })
            .unwrap_or(DEFAULT_SPEECH_RATE);

        Preferences {
            lang: self
                .get(&CacheKey::Lang)
                .filter(|lang| !lang.trim().is_empty())
                .unwrap_or_else(|| device_language.to_owned()),
            theme: match self.get(&CacheKey::DarkMode).as_deref() {
                Some("true") => Theme::Dark,
                _ => Theme::Light,
            },
            speech_rate,
            user_name: self
                .get(&CacheKey::UserName)
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_NAME.to_owned()),
            last_code: self.get(&CacheKey::LastCode),
            last_output: self.get(&CacheKey::LastOutput),
        }
    }

    /// Persists the content locale.
    pub fn set_lang(&self, lang: &str) {
        self.set(&CacheKey::Lang, lang);
    }

    /// Persists the theme.
    pub fn set_theme(&self, theme: Theme) {
        self.set(&CacheKey::DarkMode, (theme == Theme::Dark).to_string());
    }

    /// Persists the narration rate.
    pub fn set_speech_rate(&self, rate: f32) {
        self.set(&CacheKey::SpeechRate, rate.to_string());
    }

    /// Persists the display name.
    pub fn set_user_name(&self, name: &str) {
        self.set(&CacheKey::UserName, name);
    }
}

/// Infers the device language from `LC_ALL`, then `LANG`.
#[must_use]
pub fn device_language() -> String {
    ["LC_ALL", "LANG"]
        .iter()
        .find_map(|var| language_from_locale(std::env::var(var).ok().as_deref()))
        .unwrap_or_else(|| "en".to_owned())
}

/// Extracts the primary language subtag from a POSIX locale such as
/// `fr_FR.UTF-8`. Returns `None` for `C`, `POSIX` and empty values.
#[must_use]
pub fn language_from_locale(locale: Option<&str>) -> Option<String> {
    let locale = locale?.trim();
    let primary = locale
        .split(['_', '-', '.', '@'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match primary.as_str() {
        "" | "c" | "posix" => None,
        _ if primary.chars().all(|c| c.is_ascii_alphabetic()) => Some(primary),
        _ => None,
    }
}
