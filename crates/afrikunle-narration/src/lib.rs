//! Afrikunle — narration.
//!
//! Speaks lesson text through whichever `SpeechEngine` the platform offers.
//! A monotonically increasing sequence decides which request may still touch
//! the "is speaking" state, so a preempted or stopped utterance never leaves
//! the controller stuck.

pub mod application;
pub mod domain;
