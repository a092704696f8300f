//! Afrikunle — client handle.
//!
//! Wires the content, cache, narration and health crates to concrete
//! platform capabilities and exposes them through one explicitly constructed
//! `AfrikunleClient` with a start/shutdown lifecycle.

pub mod client;
pub mod config;
pub mod error;
pub mod speech;
pub mod telemetry;

pub use client::{AfrikunleClient, Platform};
pub use config::AppConfig;
pub use error::AppError;
