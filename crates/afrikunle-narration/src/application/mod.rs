//! Playback orchestration.

pub mod controller;
