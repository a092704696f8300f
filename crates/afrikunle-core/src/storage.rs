//! Device-local key/value storage abstraction.

use async_trait::async_trait;

use crate::error::ClientError;

/// Durable string key/value store scoped to one device.
///
/// Only the local cache talks to a store; nothing else mutates persisted
/// state directly.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value. `Ok(None)` means the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
}
