//! Speech through the `espeak-ng` command-line synthesizer.

use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use afrikunle_core::error::ClientError;
use afrikunle_core::speech::{PlaybackEnd, SpeechEngine, Utterance, Voice};
use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Program invoked when none is given.
pub const DEFAULT_PROGRAM: &str = "espeak-ng";

/// `espeak-ng` speed at rate 1.0, in words per minute.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// `espeak-ng` pitch at pitch 1.0, on its 0-99 scale.
const BASE_PITCH: f32 = 50.0;

/// Engine that spawns one synthesizer process per utterance.
#[derive(Debug)]
pub struct CommandSpeechEngine {
    program: String,
    stop_all: Mutex<CancellationToken>,
}

impl Default for CommandSpeechEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSpeechEngine {
    /// Engine driving `espeak-ng` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Engine driving another binary with the same command line.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            stop_all: Mutex::new(CancellationToken::new()),
        }
    }

    fn unavailable(&self, detail: impl std::fmt::Display) -> ClientError {
        ClientError::VoiceUnavailable(format!("{}: {detail}", self.program))
    }
}

/// Parses the table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  en-us           --/M      English_(America)  gmw/en-US            (en 5)
/// ```
#[must_use]
pub fn parse_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Pty"))
        .skip(1)
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _priority = columns.next()?;
            let language = columns.next()?;
            let _age_gender = columns.next()?;
            let name = columns.next()?;
            Some(Voice {
                identifier: language.to_owned(),
                name: name.replace('_', " "),
                language: language.to_owned(),
            })
        })
        .collect()
}

/// Command-line arguments for one utterance.
#[must_use]
pub fn speak_args(utterance: &Utterance) -> Vec<String> {
    let words_per_minute = (BASE_WORDS_PER_MINUTE * utterance.rate).clamp(80.0, 450.0).round();
    let pitch = (BASE_PITCH * utterance.pitch).clamp(0.0, 99.0).round();
    vec![
        "-v".to_owned(),
        utterance.voice.clone(),
        "-s".to_owned(),
        format!("{words_per_minute}"),
        "-p".to_owned(),
        format!("{pitch}"),
        "--".to_owned(),
        utterance.text.clone(),
    ]
}

#[async_trait]
impl SpeechEngine for CommandSpeechEngine {
    async fn voices(&self) -> Result<Vec<Voice>, ClientError> {
        let output = Command::new(&self.program)
            .arg("--voices")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.unavailable(e))?;
        if !output.status.success() {
            return Err(self.unavailable(output.status));
        }

        let voices = parse_voices(&String::from_utf8_lossy(&output.stdout));
        debug!(count = voices.len(), "synthesizer voices listed");
        Ok(voices)
    }

    async fn speak(
        &self,
        utterance: Utterance,
        cancel: CancellationToken,
    ) -> Result<PlaybackEnd, ClientError> {
        let stop_all = self
            .stop_all
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut child = Command::new(&self.program)
            .args(speak_args(&utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.unavailable(e))?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| self.unavailable(e))?;
                if status.success() {
                    Ok(PlaybackEnd::Completed)
                } else {
                    Err(self.unavailable(status))
                }
            }
            () = cancel.cancelled() => {
                stop_child(&mut child).await;
                Ok(PlaybackEnd::Cancelled)
            }
            () = stop_all.cancelled() => {
                stop_child(&mut child).await;
                Ok(PlaybackEnd::Cancelled)
            }
        }
    }

    async fn cancel(&self) {
        let previous =
            std::mem::take(&mut *self.stop_all.lock().unwrap_or_else(PoisonError::into_inner));
        previous.cancel();
    }
}

async fn stop_child(child: &mut tokio::process::Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "could not stop synthesizer process");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  en-gb           --/M      English_(Great_Britain) gmw/en               (en 2)
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
 5  fr-fr           --/M      French             roa/fr               (fr 5)
";

    #[test]
    fn test_parse_voices_reads_language_and_name() {
        let voices = parse_voices(LISTING);

        assert_eq!(voices.len(), 3);
        assert_eq!(voices[1].identifier, "en-us");
        assert_eq!(voices[1].language, "en-us");
        assert_eq!(voices[1].name, "English (America)");
        assert_eq!(voices[2].language, "fr-fr");
    }

    #[test]
    fn test_parse_voices_ignores_noise_before_header() {
        let listing = format!("espeak-ng: warning\n{LISTING}\n");

        assert_eq!(parse_voices(&listing).len(), 3);
        assert!(parse_voices("").is_empty());
    }

    #[test]
    fn test_speak_args_scale_rate_and_pitch() {
        // Arrange
        let utterance = Utterance {
            text: "-dash leading text".to_owned(),
            language: "fr-FR".to_owned(),
            voice: "fr-fr".to_owned(),
            rate: 0.8,
            pitch: 1.2,
        };

        // Act
        let args = speak_args(&utterance);

        // Assert
        assert_eq!(
            args,
            vec!["-v", "fr-fr", "-s", "140", "-p", "60", "--", "-dash leading text"]
        );
    }

    #[test]
    fn test_speak_args_clamp_extreme_rates() {
        let mut utterance = Utterance {
            text: "hi".to_owned(),
            language: "en-US".to_owned(),
            voice: "en-us".to_owned(),
            rate: 10.0,
            pitch: 3.0,
        };
        assert_eq!(&speak_args(&utterance)[2..6], ["-s", "450", "-p", "99"]);

        utterance.rate = 0.01;
        assert_eq!(speak_args(&utterance)[3], "80");
    }

    #[tokio::test]
    async fn test_missing_program_is_voice_unavailable() {
        let engine = CommandSpeechEngine::with_program("afrikunle-no-such-synthesizer");

        let voices = engine.voices().await;
        let spoken = engine
            .speak(
                Utterance {
                    text: "hello".to_owned(),
                    language: "en-US".to_owned(),
                    voice: "en-us".to_owned(),
                    rate: 1.0,
                    pitch: 1.0,
                },
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(voices, Err(ClientError::VoiceUnavailable(_))));
        assert!(matches!(spoken, Err(ClientError::VoiceUnavailable(_))));
    }
}
