//! Per-session turn serialization (spec.md §5 "Ordering": turns for the
//! same session are serialized; turns for different sessions never block
//! each other).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the per-session lock for `session_id`, creating it if this
    /// is the first turn seen for that session. The map lock itself is held
    /// only long enough to fetch-or-insert the `Arc`, never for the
    /// duration of the turn.
    pub async fn acquire(&self, session_id: Uuid) -> OwnedMutexGuard<()> {
        let session_lock = {
            let mut map = self.locks.lock().await;
            map.entry(session_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        session_lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_session_turns_serialize() {
        let locks = Arc::new(SessionLocks::new());
        let session_id = Uuid::new_v4();
        let counter = Arc::new(AtomicU32::new(0));
        let overlap_seen = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let locks = locks.clone();
            let counter = counter.clone();
            let overlap_seen = overlap_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(session_id).await;
                let before = counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                if counter.load(Ordering::SeqCst) != before + 1 {
                    overlap_seen.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(overlap_seen.load(Ordering::SeqCst), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn distinct_sessions_do_not_block_each_other() {
        let locks = Arc::new(SessionLocks::new());
        let a = locks.acquire(Uuid::new_v4()).await;
        let b = locks.acquire(Uuid::new_v4()).await;
        drop(a);
        drop(b);
    }
}
