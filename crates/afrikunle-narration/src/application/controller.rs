//! The narration controller.
//!
//! States are `Idle` and `Speaking`. A new `speak` preempts the current
//! utterance in place; `stop` always lands in `Idle`. Every request takes the
//! next value of a monotonic sequence, and a request may only move the state
//! while its sequence is the latest. Both the check and the write happen
//! under the state channel's lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use afrikunle_core::error::ClientError;
use afrikunle_core::speech::{PlaybackEnd, SpeechEngine, Utterance};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::domain::script::{EXCERPT_PITCH, LessonScript, NEUTRAL_PITCH, speech_language};
use crate::domain::voice_selection::select_voice;

/// Delay between the intro and the excerpt.
pub const DEFAULT_STAGE_DELAY: Duration = Duration::from_millis(3500);

/// Controller state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NarrationState {
    /// Nothing playing.
    #[default]
    Idle,
    /// Playing the utterance tagged `sequence`.
    Speaking {
        /// Tag of the playing request.
        sequence: u64,
        /// Text being spoken.
        text: String,
    },
}

/// One thing to say.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationRequest {
    /// Text to speak.
    pub text: String,
    /// Content locale, e.g. `fr`.
    pub locale: String,
    /// Playback rate.
    pub rate: f32,
    /// Voice pitch.
    pub pitch: f32,
}

impl NarrationRequest {
    /// A request at neutral pitch.
    #[must_use]
    pub fn new(text: impl Into<String>, locale: impl Into<String>, rate: f32) -> Self {
        Self {
            text: text.into(),
            locale: locale.into(),
            rate,
            pitch: NEUTRAL_PITCH,
        }
    }

    /// Overrides the pitch.
    #[must_use]
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }
}

/// Result of a `speak` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Playback started under `sequence`.
    Started {
        /// The request's tag.
        sequence: u64,
    },
    /// A newer request or a stop arrived first; nothing was played.
    Superseded,
}

struct Shared {
    sequence: AtomicU64,
    active: Mutex<Option<CancellationToken>>,
    state: watch::Sender<NarrationState>,
}

impl Shared {
    fn is_current(&self, sequence: u64) -> bool {
        self.sequence.load(Ordering::SeqCst) == sequence
    }

    fn cancel_active(&self) {
        if let Some(token) = self.active.lock().ok().and_then(|mut active| active.take()) {
            token.cancel();
        }
    }

    /// Moves to `Idle` if `sequence` is still the latest request.
    fn settle(&self, sequence: u64) {
        self.state.send_if_modified(|state| {
            if !self.is_current(sequence) || *state == NarrationState::Idle {
                return false;
            }
            *state = NarrationState::Idle;
            true
        });
    }
}

/// Drives a `SpeechEngine`.
pub struct NarrationController {
    engine: Arc<dyn SpeechEngine>,
    shared: Arc<Shared>,
    stage_delay: Duration,
}

impl std::fmt::Debug for NarrationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationController")
            .field("sequence", &self.shared.sequence.load(Ordering::SeqCst))
            .field("stage_delay", &self.stage_delay)
            .finish_non_exhaustive()
    }
}

impl NarrationController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            shared: Arc::new(Shared {
                sequence: AtomicU64::new(0),
                active: Mutex::new(None),
                state: watch::Sender::new(NarrationState::Idle),
            }),
            stage_delay: DEFAULT_STAGE_DELAY,
        }
    }

    /// Sets the delay between narration stages.
    #[must_use]
    pub fn with_stage_delay(mut self, delay: Duration) -> Self {
        self.stage_delay = delay;
        self
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> NarrationState {
        self.shared.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NarrationState> {
        self.shared.state.subscribe()
    }

    /// Speaks `text` in `locale` at `rate` and neutral pitch.
    ///
    /// # Errors
    ///
    /// See [`NarrationController::speak_request`].
    pub async fn speak(
        &self,
        text: &str,
        locale: &str,
        rate: f32,
    ) -> Result<SpeakOutcome, ClientError> {
        self.speak_request(NarrationRequest::new(text, locale, rate))
            .await
    }

    /// Preempts whatever is playing and starts `request`. Returns once
    /// playback has started; playback itself runs in the background.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::VoiceUnavailable` when the engine cannot list
    /// voices or offers none. The controller is left `Idle`.
    #[instrument(skip(self, request), fields(locale = %request.locale, sequence = tracing::field::Empty))]
    pub async fn speak_request(
        &self,
        request: NarrationRequest,
    ) -> Result<SpeakOutcome, ClientError> {
        let sequence = self.shared.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::Span::current().record("sequence", sequence);
        self.shared.cancel_active();

        let language = speech_language(&request.locale);
        let voice = match self.engine.voices().await {
            Ok(voices) => select_voice(&voices, &language)
                .map(|voice| voice.identifier.clone())
                .ok_or_else(|| ClientError::VoiceUnavailable(language.clone())),
            Err(e) => Err(e),
        };
        let voice = match voice {
            Ok(voice) => voice,
            Err(e) => {
                warn!(error = %e, "narration unavailable");
                self.shared.settle(sequence);
                return Err(e);
            }
        };

        let token = CancellationToken::new();
        let started = self.shared.state.send_if_modified(|state| {
            if !self.shared.is_current(sequence) {
                return false;
            }
            if let Ok(mut active) = self.shared.active.lock() {
                *active = Some(token.clone());
            }
            *state = NarrationState::Speaking {
                sequence,
                text: request.text.clone(),
            };
            true
        });
        if !started {
            debug!("superseded before playback started");
            return Ok(SpeakOutcome::Superseded);
        }

        let utterance = Utterance {
            text: request.text,
            language,
            voice,
            rate: request.rate,
            pitch: request.pitch,
        };
        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            match engine.speak(utterance, token).await {
                Ok(PlaybackEnd::Completed) => debug!(sequence, "utterance completed"),
                Ok(PlaybackEnd::Cancelled) => debug!(sequence, "utterance cancelled"),
                Err(e) => warn!(sequence, error = %e, "utterance failed"),
            }
            shared.settle(sequence);
        });

        Ok(SpeakOutcome::Started { sequence })
    }

    /// Cancels playback and moves to `Idle`. Safe to call at any time.
    pub async fn stop(&self) {
        let sequence = self.shared.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.cancel_active();
        self.engine.cancel().await;
        self.shared.state.send_if_modified(|state| {
            if *state == NarrationState::Idle {
                return false;
            }
            *state = NarrationState::Idle;
            true
        });
        debug!(sequence, "narration stopped");
    }

    /// Speaks the intro, then after the stage delay and once the intro has
    /// finished, the excerpt. Returns `Superseded` as soon as another request
    /// or a stop takes over.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::VoiceUnavailable` if either stage cannot start.
    pub async fn narrate_lesson(
        &self,
        script: &LessonScript,
        locale: &str,
        rate: f32,
    ) -> Result<SpeakOutcome, ClientError> {
        let intro = NarrationRequest::new(&script.intro, locale, rate);
        let SpeakOutcome::Started { sequence } = self.speak_request(intro).await? else {
            return Ok(SpeakOutcome::Superseded);
        };

        tokio::time::sleep(self.stage_delay).await;
        if !self.shared.is_current(sequence) {
            debug!(sequence, "excerpt dropped after stage delay");
            return Ok(SpeakOutcome::Superseded);
        }

        self.settled(sequence).await;
        if !self.shared.is_current(sequence) {
            debug!(sequence, "excerpt dropped after intro");
            return Ok(SpeakOutcome::Superseded);
        }

        let excerpt = NarrationRequest::new(&script.excerpt, locale, rate).with_pitch(EXCERPT_PITCH);
        self.speak_request(excerpt).await
    }

    /// Waits until nothing is playing.
    pub async fn idle(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx.wait_for(|state| *state == NarrationState::Idle).await;
    }

    /// Waits until the utterance tagged `sequence` is no longer playing.
    async fn settled(&self, sequence: u64) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx
            .wait_for(|state| {
                !matches!(state, NarrationState::Speaking { sequence: s, .. } if *s == sequence)
            })
            .await;
    }
}
