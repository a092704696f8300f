//! Response normalization.
//!
//! Reconciles the backend's payload shapes (bare object or list-wrapped,
//! plain or per-locale strings) into one `LessonContent`. Locale fallback is
//! decided here and nowhere else.

use afrikunle_core::error::ClientError;
use serde_json::{Map, Value};

use super::lesson::{LessonContent, LessonId, Level, Quiz};

/// Which locales to try when the requested one is missing from a
/// per-locale mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalePolicy {
    fallback: Vec<String>,
}

impl Default for LocalePolicy {
    fn default() -> Self {
        Self {
            fallback: vec!["en".to_owned()],
        }
    }
}

impl LocalePolicy {
    /// Creates a policy trying `fallback` in order after the requested locale.
    #[must_use]
    pub fn new(fallback: Vec<String>) -> Self {
        Self { fallback }
    }

    /// Picks the text for `locale` out of a per-locale mapping.
    ///
    /// Order: exact key, primary subtag of `locale`, the fallback list, then
    /// the first key in insertion order holding usable text.
    #[must_use]
    pub fn select(&self, map: &Map<String, Value>, locale: &str) -> Option<String> {
        let primary = locale.split(['-', '_']).next().unwrap_or(locale);
        std::iter::once(locale)
            .chain(std::iter::once(primary))
            .chain(self.fallback.iter().map(String::as_str))
            .find_map(|key| map.get(key).and_then(plain_text))
            .or_else(|| map.values().find_map(plain_text))
    }

    fn localized(&self, value: Option<&Value>, locale: &str) -> Option<String> {
        match value? {
            Value::Object(map) => self.select(map, locale),
            other => plain_text(other),
        }
    }
}

fn plain_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Unwraps list-shaped payloads to their first element and checks that the
/// result is an object.
fn lesson_object(raw: &Value) -> Option<&Map<String, Value>> {
    let candidate = match raw {
        Value::Array(items) => items.first()?,
        other => other,
    };
    candidate.as_object()
}

/// Whether `raw` would normalize successfully.
#[must_use]
pub fn is_usable(raw: &Value) -> bool {
    let policy = LocalePolicy::default();
    lesson_object(raw).is_some_and(|object| {
        policy.localized(object.get("title"), "en").is_some()
            || policy.localized(object.get("body"), "en").is_some()
    })
}

/// Normalizes a raw lesson payload for `locale`.
///
/// # Errors
///
/// Returns `ClientError::EmptyOrMalformed` if the payload is absent, is not
/// an object (after unwrapping a list), or carries neither a title nor a body.
pub fn normalize(
    raw: &Value,
    locale: &str,
    policy: &LocalePolicy,
) -> Result<LessonContent, ClientError> {
    let object = lesson_object(raw).ok_or(ClientError::EmptyOrMalformed)?;

    let title = policy.localized(object.get("title"), locale);
    let body = policy.localized(object.get("body"), locale);
    if title.is_none() && body.is_none() {
        return Err(ClientError::EmptyOrMalformed);
    }

    let quiz = object.get("quiz").and_then(Value::as_object).and_then(|quiz| {
        let question = policy.localized(quiz.get("question"), locale);
        let answer = policy.localized(quiz.get("answer"), locale);
        (question.is_some() || answer.is_some()).then(|| Quiz {
            question: question.unwrap_or_default(),
            answer: answer.unwrap_or_default(),
        })
    });

    Ok(LessonContent {
        id: object.get("id").and_then(LessonId::from_json),
        title: title.unwrap_or_default(),
        body: body.unwrap_or_default(),
        level: policy.localized(object.get("level"), locale).map(Level::from),
        quiz,
    })
}
