//! Afrikunle — lesson retrieval.
//!
//! Fetches lessons and code-run results from a backend whose routing and
//! payload shapes are not stable: probes candidate endpoints under a deadline,
//! normalizes whatever shape wins, and falls back to the last-good copy in
//! the local cache.

pub mod application;
pub mod domain;
