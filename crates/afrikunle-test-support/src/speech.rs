//! Test speech engine — scripted `SpeechEngine` implementation for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use afrikunle_core::error::ClientError;
use afrikunle_core::speech::{PlaybackEnd, SpeechEngine, Utterance, Voice};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// An utterance the engine received, with how it settled.
#[derive(Debug, Clone, PartialEq)]
pub struct SpokenUtterance {
    /// The utterance as handed to the engine.
    pub utterance: Utterance,
    /// `None` while playback is still running.
    pub end: Option<PlaybackEnd>,
}

/// A speech engine whose utterances each take a fixed time on the tokio
/// clock. Records everything it was asked to say.
#[derive(Debug)]
pub struct ScriptedSpeechEngine {
    voices: Option<Vec<Voice>>,
    playback: Duration,
    spoken: Mutex<Vec<SpokenUtterance>>,
    stop_all: Mutex<CancellationToken>,
    cancel_calls: AtomicUsize,
}

impl ScriptedSpeechEngine {
    /// Creates an engine offering `voices`, each utterance playing for
    /// `playback`.
    #[must_use]
    pub fn new(voices: Vec<Voice>, playback: Duration) -> Self {
        Self {
            voices: Some(voices),
            playback,
            spoken: Mutex::new(Vec::new()),
            stop_all: Mutex::new(CancellationToken::new()),
            cancel_calls: AtomicUsize::new(0),
        }
    }

    /// An engine with an English and a French voice.
    #[must_use]
    pub fn bilingual(playback: Duration) -> Self {
        Self::new(
            vec![
                voice("com.apple.voice.Samantha", "Samantha", "en-US"),
                voice("com.apple.voice.Thomas", "Thomas", "fr-FR"),
            ],
            playback,
        )
    }

    /// An engine whose voice enumeration fails.
    #[must_use]
    pub fn broken() -> Self {
        Self {
            voices: None,
            ..Self::new(Vec::new(), Duration::ZERO)
        }
    }

    /// Returns a snapshot of every utterance received, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn spoken(&self) -> Vec<SpokenUtterance> {
        self.spoken.lock().unwrap().clone()
    }

    /// Returns only the texts received, in order.
    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken()
            .into_iter()
            .map(|s| s.utterance.text)
            .collect()
    }

    /// Number of engine-wide `cancel` calls.
    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

/// Builds a `Voice` whose name doubles as its display name.
#[must_use]
pub fn voice(identifier: &str, name: &str, language: &str) -> Voice {
    Voice {
        identifier: identifier.to_owned(),
        name: name.to_owned(),
        language: language.to_owned(),
    }
}

#[async_trait]
impl SpeechEngine for ScriptedSpeechEngine {
    async fn voices(&self) -> Result<Vec<Voice>, ClientError> {
        self.voices
            .clone()
            .ok_or_else(|| ClientError::VoiceUnavailable("voice service unavailable".to_owned()))
    }

    async fn speak(
        &self,
        utterance: Utterance,
        cancel: CancellationToken,
    ) -> Result<PlaybackEnd, ClientError> {
        let stop_all = self.stop_all.lock().unwrap().clone();
        let index = {
            let mut spoken = self.spoken.lock().unwrap();
            spoken.push(SpokenUtterance {
                utterance,
                end: None,
            });
            spoken.len() - 1
        };

        let end = tokio::select! {
            () = tokio::time::sleep(self.playback) => PlaybackEnd::Completed,
            () = cancel.cancelled() => PlaybackEnd::Cancelled,
            () = stop_all.cancelled() => PlaybackEnd::Cancelled,
        };

        self.spoken.lock().unwrap()[index].end = Some(end);
        Ok(end)
    }

    async fn cancel(&self) {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        let mut stop_all = self.stop_all.lock().unwrap();
        stop_all.cancel();
        *stop_all = CancellationToken::new();
    }
}
