//! Canonical lesson content.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lesson identity; the backend uses both numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LessonId {
    /// Numeric identifier.
    Number(i64),
    /// Textual identifier.
    Text(String),
}

impl LessonId {
    /// Reads an identifier out of a JSON value.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Self::Number),
            serde_json::Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Compares by textual form, so `1` matches `"1"`.
    #[must_use]
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        Self::from_json(value).is_some_and(|other| other.to_string() == self.to_string())
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for LessonId {
    type Err = Infallible;

    /// Canonical integers become `Number`; anything else, including `"007"`
    /// or `"+7"`, stays `Text` so the id is requested as typed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => Self::Number(n),
            _ => Self::Text(s.to_owned()),
        })
    }
}

impl From<i64> for LessonId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

/// Difficulty tag. The set is open: unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Level {
    /// Beginner.
    Beginner,
    /// Intermediate.
    Intermediate,
    /// Advanced.
    Advanced,
    /// Any other tag the backend sends.
    Other(String),
}

impl Level {
    /// Case-insensitive comparison of the tag text.
    #[must_use]
    pub fn matches(&self, other: &Level) -> bool {
        self.to_string().eq_ignore_ascii_case(&other.to_string())
    }
}

impl From<String> for Level {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "beginner" => Self::Beginner,
            "intermediate" => Self::Intermediate,
            "advanced" => Self::Advanced,
            _ => Self::Other(raw),
        }
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.to_string()
    }
}

impl FromStr for Level {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginner => f.write_str("Beginner"),
            Self::Intermediate => f.write_str("Intermediate"),
            Self::Advanced => f.write_str("Advanced"),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

/// A lesson's quiz, resolved to the requested locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    /// Question text.
    pub question: String,
    /// Expected answer (usually a code snippet).
    pub answer: String,
}

/// A lesson after normalization: every localizable field is plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonContent {
    /// Identity, when the payload carried one.
    pub id: Option<LessonId>,
    /// Title text.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Difficulty tag.
    pub level: Option<Level>,
    /// Optional quiz.
    pub quiz: Option<Quiz>,
}
