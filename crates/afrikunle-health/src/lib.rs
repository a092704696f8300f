//! Afrikunle — backend health.
//!
//! The monitor is the client's only long-lived background activity: it polls
//! `{base}/health` right away and then on a fixed interval until its handle
//! is stopped or dropped.

pub mod monitor;

pub use monitor::{HealthHandle, HealthMonitor, HealthSnapshot, HealthStatus};
