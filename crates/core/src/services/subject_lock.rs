//! Per-subject sequencing of warn processing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Table size at which released entries are swept.
const SWEEP_THRESHOLD: usize = 1024;

/// Keyed async mutex: one lock per subject, created on demand.
///
/// Entries whose lock is no longer held or awaited are swept once the table
/// reaches `SWEEP_THRESHOLD`, so it stays bounded by the subjects in flight.
#[derive(Clone, Default)]
pub struct SubjectLocks {
    locks: Arc<Mutex<HashMap<String, Weak<AsyncMutex<()>>>>>,
}

impl SubjectLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `subject_id`.
    pub async fn lock(&self, subject_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() >= SWEEP_THRESHOLD {
                locks.retain(|_, lock| lock.strong_count() > 0);
            }
            if let Some(existing) = locks.get(subject_id).and_then(Weak::upgrade) {
                existing
            } else {
                let created = Arc::new(AsyncMutex::new(()));
                locks.insert(subject_id.to_string(), Arc::downgrade(&created));
                created
            }
        };
        lock.lock_owned().await
    }

    /// Number of subjects with a live lock.
    #[must_use]
    pub fn tracked(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|lock| lock.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_subject_is_exclusive() {
        let locks = SubjectLocks::new();
        let guard = locks.lock("user1").await;

        let contended = tokio::time::timeout(Duration::from_millis(50), locks.lock("user1")).await;
        assert!(contended.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(50), locks.lock("user1")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_subjects_do_not_block() {
        let locks = SubjectLocks::new();
        let _first = locks.lock("user1").await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock("user2")).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_released_locks_are_swept() {
        let locks = SubjectLocks::new();
        drop(locks.lock("user1").await);
        drop(locks.lock("user2").await);

        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_table_stays_bounded_across_many_subjects() {
        let locks = SubjectLocks::new();
        let held = locks.lock("user-held").await;

        for n in 0..SWEEP_THRESHOLD * 3 {
            drop(locks.lock(&format!("user{n}")).await);
        }

        let table = locks.locks.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(table.len() <= SWEEP_THRESHOLD);
        assert!(table.contains_key("user-held"));
        drop(table);

        drop(held);
        assert_eq!(locks.tracked(), 0);
    }
}
