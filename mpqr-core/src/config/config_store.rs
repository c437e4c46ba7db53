//! Versioned configuration cell with change notification.

use std::sync::Arc;
use tokio::sync::{RwLock, watch};

/// A shared configuration value that can be swapped at runtime.
///
/// Readers take cheap snapshots; every [`update`](ConfigStore::update) bumps
/// a version that subscribers can await.
pub struct ConfigStore<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    value: RwLock<T>,
    version_tx: watch::Sender<u64>,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (version_tx, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(initial),
                version_tx,
            }),
        }
    }

    /// Replace the value and notify subscribers.
    pub async fn update(&self, value: T) {
        *self.inner.value.write().await = value;
        self.inner.version_tx.send_modify(|version| *version += 1);
    }

    /// Receiver yielding the version after each update.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.version_tx.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.inner.version_tx.borrow()
    }
}

impl<T: Clone> ConfigStore<T> {
    /// Clone of the current value. Never held across provider calls.
    pub async fn snapshot(&self) -> T {
        self.inner.value.read().await.clone()
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_is_visible_to_clones_and_subscribers() {
        let store = ConfigStore::new(1u32);
        let reader = store.clone();
        let mut versions = store.subscribe();

        store.update(2).await;

        assert_eq!(reader.snapshot().await, 2);
        versions.changed().await.unwrap();
        assert_eq!(*versions.borrow(), 1);
        assert_eq!(reader.version(), 1);
    }
}
