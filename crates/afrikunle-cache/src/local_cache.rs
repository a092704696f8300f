//! The local cache: in-memory view over a durable `KeyValueStore`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use afrikunle_core::storage::KeyValueStore;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::keys::CacheKey;

enum WriteOp {
    Set { key: String, value: String },
    Flush(oneshot::Sender<()>),
}

/// Device-local cache.
///
/// Writes land in memory immediately and reach the store through a single
/// writer task, so the store sees them in call order (last write wins).
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
    values: RwLock<HashMap<String, String>>,
    writer: Mutex<Option<mpsc::UnboundedSender<WriteOp>>>,
    writer_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.values.read().map(|v| v.len()).unwrap_or_default();
        f.debug_struct("LocalCache").field("entries", &len).finish()
    }
}

impl LocalCache {
    /// Opens the cache, reading the startup keys within `grace`.
    ///
    /// Keys that fail to load, are absent, or are not reached before the
    /// grace period elapses stay unset; callers apply their defaults.
    pub async fn open(store: Arc<dyn KeyValueStore>, grace: Duration) -> Self {
        let deadline = Instant::now() + grace;
        let mut values = HashMap::new();

        for key in &CacheKey::STARTUP {
            let key = key.to_string();
            match tokio::time::timeout_at(deadline, store.get(&key)).await {
                Ok(Ok(Some(value))) => {
                    values.insert(key, value);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => warn!(%key, error = %e, "cache read failed, using default"),
                Err(_) => {
                    warn!(%key, ?grace, "cache startup read exceeded grace period");
                    break;
                }
            }
        }
        debug!(loaded = values.len(), "cache opened");

        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(run_writer(Arc::clone(&store), rx));

        Self {
            store,
            values: RwLock::new(values),
            writer: Mutex::new(Some(tx)),
            writer_task: Mutex::new(Some(writer_task)),
        }
    }

    /// Returns the cached value for `key`, if loaded or written.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.values
            .read()
            .ok()
            .and_then(|values| values.get(&key.to_string()).cloned())
    }

    /// Returns the value for `key`, reading it from the store if it was not
    /// part of the startup set. Read failures are logged and yield `None`.
    pub async fn load(&self, key: &CacheKey) -> Option<String> {
        if let Some(value) = self.get(key) {
            return Some(value);
        }
        let name = key.to_string();
        match self.store.get(&name).await {
            Ok(Some(value)) => {
                if let Ok(mut values) = self.values.write() {
                    values.entry(name).or_insert_with(|| value.clone());
                }
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %name, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Records `value` under `key`. Never fails; persistence happens in the
    /// background and failures are only logged.
    pub fn set(&self, key: &CacheKey, value: impl Into<String>) {
        let key = key.to_string();
        let value = value.into();
        if let Ok(mut values) = self.values.write() {
            values.insert(key.clone(), value.clone());
        }
        let sent = self
            .writer
            .lock()
            .ok()
            .and_then(|writer| writer.as_ref().map(|tx| tx.send(WriteOp::Set { key, value })));
        if !matches!(sent, Some(Ok(()))) {
            warn!("cache write dropped: cache is closed");
        }
    }

    /// Waits until every write issued so far has reached the store.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        let sent = self
            .writer
            .lock()
            .ok()
            .and_then(|writer| writer.as_ref().map(|tx| tx.send(WriteOp::Flush(done_tx))));
        if matches!(sent, Some(Ok(()))) {
            let _ = done_rx.await;
        }
    }

    /// Flushes pending writes and stops the writer task. Later writes are
    /// dropped with a warning.
    pub async fn close(&self) {
        let writer = self.writer.lock().ok().and_then(|mut w| w.take());
        drop(writer);
        let task = self.writer_task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "cache writer task ended abnormally");
            }
        }
    }
}

async fn run_writer(store: Arc<dyn KeyValueStore>, mut rx: mpsc::UnboundedReceiver<WriteOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Set { key, value } => {
                if let Err(e) = store.set(&key, &value).await {
                    warn!(%key, error = %e, "cache write failed");
                }
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
