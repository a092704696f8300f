//! Candidate endpoints per logical resource.
//!
//! The backend's routing shape differs between deployments, so each resource
//! has an ordered list of URL templates that the resolver probes in turn.

use serde_json::Value;

use super::lesson::LessonId;
use super::normalizer;

/// Default lesson candidates, in probing order.
pub const DEFAULT_LESSON_CANDIDATES: [&str; 4] = [
    "{base}/api/lesson/{id}?lang={locale}",
    "{base}/api/lessons/{id}?lang={locale}",
    "{base}/api/lessons?lang={locale}",
    "{base}/api/lesson?lang={locale}",
];

/// The lesson list has one fixed route.
pub const LESSON_LIST_CANDIDATES: [&str; 1] = ["{base}/api/lessons?lang={locale}"];

/// A logical resource the client can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// One lesson by id.
    Lesson,
    /// Every lesson.
    LessonList,
}

impl ResourceKind {
    /// Whether a 2xx payload is usable for this resource.
    #[must_use]
    pub fn accepts(self, payload: &Value) -> bool {
        match self {
            Self::Lesson => normalizer::is_usable(payload),
            Self::LessonList => payload
                .as_array()
                .is_some_and(|items| items.iter().any(normalizer::is_usable)),
        }
    }

    /// Narrows a list payload to the element matching the requested id.
    ///
    /// A list whose elements carry ids but none the requested one narrows to
    /// `Null`, which no resource accepts. Lists without ids and non-list
    /// payloads pass through untouched.
    #[must_use]
    pub fn narrow(self, payload: Value, params: &ResourceParams) -> Value {
        match (self, &params.id, payload) {
            (Self::Lesson, Some(id), Value::Array(items)) => {
                if !items.iter().any(|item| item.get("id").is_some()) {
                    return Value::Array(items);
                }
                items
                    .into_iter()
                    .find(|item| item.get("id").is_some_and(|v| id.matches(v)))
                    .unwrap_or(Value::Null)
            }
            (_, _, payload) => payload,
        }
    }
}

/// Parameters substituted into candidate templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceParams {
    /// Resource id, when the resource has one.
    pub id: Option<LessonId>,
    /// Requested locale.
    pub locale: String,
}

impl ResourceParams {
    /// Parameters for one lesson.
    #[must_use]
    pub fn lesson(id: &LessonId, locale: &str) -> Self {
        Self {
            id: Some(id.clone()),
            locale: locale.to_owned(),
        }
    }

    /// Parameters for the lesson list.
    #[must_use]
    pub fn list(locale: &str) -> Self {
        Self {
            id: None,
            locale: locale.to_owned(),
        }
    }
}

/// A URL template with `{base}`, `{id}` and `{locale}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTemplate(String);

impl CandidateTemplate {
    /// Wraps a template string.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// The raw template.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitutes the placeholders. `id` and `locale` are percent-encoded.
    #[must_use]
    pub fn expand(&self, base: &str, params: &ResourceParams) -> String {
        let id = params
            .id
            .as_ref()
            .map(|id| percent_encode(&id.to_string()))
            .unwrap_or_default();
        self.0
            .replace("{base}", base.trim_end_matches('/'))
            .replace("{id}", &id)
            .replace("{locale}", &percent_encode(&params.locale))
    }
}

/// Ordered candidate lists for every resource kind, bound to a base URL.
#[derive(Debug, Clone)]
pub struct EndpointCatalog {
    base_url: String,
    lesson: Vec<CandidateTemplate>,
    lesson_list: Vec<CandidateTemplate>,
}

impl EndpointCatalog {
    /// Catalog with the default candidate order.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_lesson_candidates(
            base_url,
            DEFAULT_LESSON_CANDIDATES
                .iter()
                .map(|t| CandidateTemplate::new(*t))
                .collect(),
        )
    }

    /// Catalog with a configured lesson candidate order.
    #[must_use]
    pub fn with_lesson_candidates(
        base_url: impl Into<String>,
        lesson: Vec<CandidateTemplate>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            lesson,
            lesson_list: LESSON_LIST_CANDIDATES
                .iter()
                .map(|t| CandidateTemplate::new(*t))
                .collect(),
        }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Expanded candidate URLs for `kind`, in probing order.
    #[must_use]
    pub fn candidates(&self, kind: ResourceKind, params: &ResourceParams) -> Vec<String> {
        let templates = match kind {
            ResourceKind::Lesson => &self.lesson,
            ResourceKind::LessonList => &self.lesson_list,
        };
        templates
            .iter()
            .map(|t| t.expand(&self.base_url, params))
            .collect()
    }
}

fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
