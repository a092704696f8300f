//! Namespaced cache keys.

use std::fmt;

/// Every key the cache persists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Preferred content locale.
    Lang,
    /// `"true"` when the dark theme is selected.
    DarkMode,
    /// Narration playback rate.
    SpeechRate,
    /// Display name used in narration intros.
    UserName,
    /// Last code submitted to the runner.
    LastCode,
    /// Last output shown for a code run.
    LastOutput,
    /// Last-good lesson for an `(id, locale)` pair.
    Lesson {
        /// Lesson identifier in textual form.
        id: String,
        /// Requested locale.
        locale: String,
    },
    /// Last-good lesson list for a locale.
    LessonList {
        /// Requested locale.
        locale: String,
    },
}

impl CacheKey {
    /// Keys read during startup, before anything else proceeds.
    pub const STARTUP: [CacheKey; 6] = [
        Self::Lang,
        Self::DarkMode,
        Self::SpeechRate,
        Self::UserName,
        Self::LastCode,
        Self::LastOutput,
    ];

    /// Cache key for a lesson.
    #[must_use]
    pub fn lesson(id: impl fmt::Display, locale: &str) -> Self {
        Self::Lesson {
            id: id.to_string(),
            locale: locale.to_owned(),
        }
    }

    /// Cache key for a lesson list.
    #[must_use]
    pub fn lesson_list(locale: &str) -> Self {
        Self::LessonList {
            locale: locale.to_owned(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lang => f.write_str("lang"),
            Self::DarkMode => f.write_str("darkMode"),
            Self::SpeechRate => f.write_str("speechRate"),
            Self::UserName => f.write_str("userName"),
            Self::LastCode => f.write_str("lastCode"),
            Self::LastOutput => f.write_str("lastOutput"),
            Self::Lesson { id, locale } => write!(f, "lesson:{id}:{locale}"),
            Self::LessonList { locale } => write!(f, "lessons:{locale}"),
        }
    }
}
