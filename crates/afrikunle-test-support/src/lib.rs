//! Shared test fakes and utilities for the Afrikunle lesson client.

mod clock;
mod speech;
mod store;
mod transport;

pub use clock::FixedClock;
pub use speech::{ScriptedSpeechEngine, SpokenUtterance, voice};
pub use store::{FailingStore, MemoryStore};
pub use transport::{Reply, ScriptedTransport};
