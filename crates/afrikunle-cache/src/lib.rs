//! Afrikunle — device-local cache.
//!
//! Owns every persisted value: user preferences and the last-good lesson,
//! lesson list and code-run output. Reads are synchronous once the startup
//! load completes; writes are fire-and-forget and never fail the caller.

pub mod file_store;
pub mod keys;
pub mod local_cache;
pub mod preferences;
