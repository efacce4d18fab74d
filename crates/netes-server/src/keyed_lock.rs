//! Per-key async mutual exclusion.
//!
//! Holders of different keys never contend. An entry exists only while
//! someone holds or waits for its key.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A table of async mutexes created on demand and dropped when idle.
#[derive(Debug, Default)]
pub struct KeyedLock {
    entries: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Released when the returned guard is dropped, including when the
    /// waiting future itself is dropped before acquiring.
    pub async fn lock(&self, key: &str) -> KeyedGuard<'_> {
        let entry = self
            .entries
            .lock()
            .entry(key.to_owned())
            .or_default()
            .clone();

        let mut guard = KeyedGuard {
            owner: self,
            key: key.to_owned(),
            held: None,
        };
        guard.held = Some(entry.lock_owned().await);
        guard
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Exclusive access to one key of a [`KeyedLock`].
#[derive(Debug)]
pub struct KeyedGuard<'a> {
    owner: &'a KeyedLock,
    key: String,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        let mut entries = self.owner.entries.lock();
        // release while the table is locked so no new waiter can race the removal
        drop(self.held.take());
        if let Some(entry) = entries.get(&self.key)
            && Arc::strong_count(entry) == 1
        {
            entries.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn entry_removed_after_release() {
        let lock = KeyedLock::new();
        {
            let _g = lock.lock("a").await;
            assert_eq!(lock.len(), 1);
        }
        assert!(lock.is_empty());
    }

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let lock = Arc::new(KeyedLock::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let lock = lock.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            tasks.push(tokio::spawn(async move {
                let _g = lock.lock("k").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(lock.is_empty());
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let lock = KeyedLock::new();
        let _a = lock.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), lock.lock("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn abandoned_waiter_leaves_no_entry() {
        let lock = KeyedLock::new();
        let held = lock.lock("a").await;
        let waited = tokio::time::timeout(Duration::from_millis(20), lock.lock("a")).await;
        assert!(waited.is_err());
        assert_eq!(lock.len(), 1);
        drop(held);
        assert!(lock.is_empty());
    }
}
