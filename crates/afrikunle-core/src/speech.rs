//! Speech synthesis capability.
//!
//! One interface ("enumerate voices", "speak", "cancel") with interchangeable
//! platform implementations chosen at startup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

/// A synthesis voice offered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Platform identifier passed back when speaking.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// BCP 47 language tag, e.g. `fr-FR`.
    pub language: String,
}

/// One utterance handed to the platform engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Text to speak.
    pub text: String,
    /// BCP 47 language tag.
    pub language: String,
    /// Voice identifier selected by the caller.
    pub voice: String,
    /// Playback rate, 1.0 is the platform's normal speed.
    pub rate: f32,
    /// Voice pitch, 1.0 is neutral.
    pub pitch: f32,
}

/// How a playback settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// The whole utterance was spoken.
    Completed,
    /// Playback was cut short by a cancellation.
    Cancelled,
}

/// Platform voice engine.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Enumerates the voices installed on the device.
    async fn voices(&self) -> Result<Vec<Voice>, ClientError>;

    /// Speaks an utterance, resolving when playback ends.
    ///
    /// Must resolve with `PlaybackEnd::Cancelled` soon after `cancel` fires.
    async fn speak(
        &self,
        utterance: Utterance,
        cancel: CancellationToken,
    ) -> Result<PlaybackEnd, ClientError>;

    /// Silences everything the engine is currently playing.
    async fn cancel(&self);
}
