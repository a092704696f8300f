//! Platform speech engines selectable from configuration.

pub mod console;
pub mod espeak;

use std::sync::Arc;

use afrikunle_core::speech::SpeechEngine;

use crate::config::SpeechBackend;

pub use console::ConsoleSpeechEngine;
pub use espeak::CommandSpeechEngine;

/// Builds the engine named by `backend`.
#[must_use]
pub fn engine_for(backend: SpeechBackend) -> Arc<dyn SpeechEngine> {
    match backend {
        SpeechBackend::Console => Arc::new(ConsoleSpeechEngine::stdout()),
        SpeechBackend::Espeak => Arc::new(CommandSpeechEngine::new()),
    }
}
