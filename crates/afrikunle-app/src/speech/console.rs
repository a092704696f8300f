//! Terminal speech: prints each utterance and holds for as long as reading
//! it aloud would take.

use std::io::Write;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use afrikunle_core::error::ClientError;
use afrikunle_core::speech::{PlaybackEnd, SpeechEngine, Utterance, Voice};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Simulated reading speed at rate 1.0.
pub const WORDS_PER_MINUTE: f64 = 160.0;

/// Speech engine that writes to a text sink.
pub struct ConsoleSpeechEngine {
    sink: Mutex<Box<dyn Write + Send>>,
    voices: Vec<Voice>,
    stop_all: Mutex<CancellationToken>,
}

impl std::fmt::Debug for ConsoleSpeechEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSpeechEngine")
            .field("voices", &self.voices)
            .finish_non_exhaustive()
    }
}

impl ConsoleSpeechEngine {
    /// Engine printing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::with_sink(std::io::stdout())
    }

    /// Engine printing to `sink`.
    #[must_use]
    pub fn with_sink(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
            voices: vec![
                Voice {
                    identifier: "console-en".to_owned(),
                    name: "Console (English)".to_owned(),
                    language: "en-US".to_owned(),
                },
                Voice {
                    identifier: "console-fr".to_owned(),
                    name: "Console (Français)".to_owned(),
                    language: "fr-FR".to_owned(),
                },
            ],
            stop_all: Mutex::new(CancellationToken::new()),
        }
    }

    fn stop_token(&self) -> CancellationToken {
        self.stop_all
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn print(&self, utterance: &Utterance) {
        let Ok(mut sink) = self.sink.lock() else {
            return;
        };
        let written = writeln!(
            sink,
            "[{} x{:.2}] {}",
            utterance.language, utterance.rate, utterance.text
        )
        .and_then(|()| sink.flush());
        if let Err(e) = written {
            warn!(error = %e, "console speech output failed");
        }
    }
}

/// How long reading `text` aloud takes at `rate`.
#[must_use]
pub fn reading_time(text: &str, rate: f32) -> Duration {
    let words = u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX);
    let rate = f64::from(rate).max(0.1);
    Duration::from_secs_f64(f64::from(words) * 60.0 / (WORDS_PER_MINUTE * rate))
}

#[async_trait]
impl SpeechEngine for ConsoleSpeechEngine {
    async fn voices(&self) -> Result<Vec<Voice>, ClientError> {
        Ok(self.voices.clone())
    }

    async fn speak(
        &self,
        utterance: Utterance,
        cancel: CancellationToken,
    ) -> Result<PlaybackEnd, ClientError> {
        let stop_all = self.stop_token();
        self.print(&utterance);

        tokio::select! {
            () = cancel.cancelled() => Ok(PlaybackEnd::Cancelled),
            () = stop_all.cancelled() => Ok(PlaybackEnd::Cancelled),
            () = tokio::time::sleep(reading_time(&utterance.text, utterance.rate)) => {
                Ok(PlaybackEnd::Completed)
            }
        }
    }

    async fn cancel(&self) {
        let previous = std::mem::take(
            &mut *self.stop_all.lock().unwrap_or_else(PoisonError::into_inner),
        );
        previous.cancel();
    }
}
