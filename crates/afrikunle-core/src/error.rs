//! Client error taxonomy.

use thiserror::Error;

/// Every failure the orchestrator can classify.
///
/// Fetch failures (`Timeout`, `Network`, `Http`, `EmptyOrMalformed`) are
/// recovered one level up by the resolver and the cache fallback.
/// `VoiceUnavailable` and `CacheUnavailable` are always recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request deadline elapsed before the call settled.
    #[error("request timed out")]
    Timeout,

    /// Transport-level failure (connection refused, DNS, reset, aborted).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Http(u16),

    /// The payload was empty or did not have a usable shape.
    #[error("response was empty or malformed")]
    EmptyOrMalformed,

    /// No matching or fallback synthesis voice for the locale.
    #[error("no synthesis voice available for locale {0}")]
    VoiceUnavailable(String),

    /// The local store could not be read or written.
    #[error("local store unavailable: {0}")]
    CacheUnavailable(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_))
    }

    /// The single consolidated notice shown to the end user.
    ///
    /// Never includes raw transport text.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Timeout | Self::Network(_) => {
                "Could not reach the Afrikunle server. Check your connection and try again."
            }
            Self::Http(_) | Self::EmptyOrMalformed => {
                "The server sent nothing usable. Please try again later."
            }
            Self::VoiceUnavailable(_) => "Voice playback is not available on this device.",
            Self::CacheUnavailable(_) => "Your settings could not be saved on this device.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_failures_are_retryable() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::Network("reset".into()).is_retryable());
        assert!(!ClientError::Http(500).is_retryable());
        assert!(!ClientError::EmptyOrMalformed.is_retryable());
    }

    #[test]
    fn test_user_message_hides_transport_detail() {
        let err = ClientError::Network("tcp connect error: 10.0.0.1:5001".into());
        assert!(!err.user_message().contains("10.0.0.1"));
        assert_eq!(
            ClientError::Timeout.user_message(),
            err.user_message(),
            "transport failures share one notice"
        );
    }

    #[test]
    fn test_unusable_answer_notice_fits_lessons_and_code_runs() {
        for err in [ClientError::Http(502), ClientError::EmptyOrMalformed] {
            let message = err.user_message().to_ascii_lowercase();

            assert!(!message.contains("lesson"), "{err:?}");
            assert!(!message.contains("code"), "{err:?}");
        }
    }
}
