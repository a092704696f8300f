//! Afrikunle Core — shared abstractions.
//!
//! This crate defines the error taxonomy, the clock, and the three platform
//! capabilities the orchestrator drives: HTTP transport, speech synthesis and
//! device-local key/value storage, plus the deadline wrapper every network
//! call goes through. It contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod speech;
pub mod storage;
pub mod timed_request;
pub mod transport;
