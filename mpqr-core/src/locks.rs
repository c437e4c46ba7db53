//! Per-transaction single-writer locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Hands out one async mutex per transaction id.
///
/// Different transactions never contend. Entries nobody holds or waits on
/// are dropped whenever a new lock is taken.
#[derive(Debug, Default)]
pub struct TransactionLocks {
    entries: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl TransactionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Released when the guard drops.
    pub async fn lock(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            entries.retain(|key, mutex| *key == id || Arc::strong_count(mutex) > 1);
            entries.entry(id).or_default().clone()
        };
        mutex.lock_owned().await
    }

    /// Number of tracked transaction ids.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_id_is_serialized() {
        let locks = Arc::new(TransactionLocks::new());
        let id = Uuid::now_v7();

        let guard = locks.lock(id).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_ids_do_not_contend() {
        let locks = TransactionLocks::new();
        let _first = locks.lock(Uuid::now_v7()).await;
        tokio::time::timeout(Duration::from_secs(1), locks.lock(Uuid::now_v7()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = TransactionLocks::new();
        for _ in 0..10 {
            let _guard = locks.lock(Uuid::now_v7()).await;
        }
        assert_eq!(locks.len(), 1);
    }
}
