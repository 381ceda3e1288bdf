use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use rst_common::with_tokio::tokio::sync::{Mutex, OwnedMutexGuard};

use crate::message::{MessageID, ThreadID};

pub const DEFAULT_PROCESSED_CAPACITY: usize = 10_000;

/// `ThreadLocks` serializes every operation touching the same protocol thread
///
/// A lock nobody holds or waits for is dropped on the next `acquire`, so finished
/// threads do not pile up
#[derive(Clone, Default)]
pub struct ThreadLocks {
    locks: Arc<Mutex<HashMap<ThreadID, Arc<Mutex<()>>>>>,
}

impl ThreadLocks {
    pub async fn acquire(&self, thread_id: &ThreadID) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);

            locks
                .entry(thread_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

struct Processed {
    ids: HashSet<MessageID>,
    order: VecDeque<MessageID>,
    capacity: usize,
}

/// `ProcessedMessages` remembers which inbound envelopes were already applied
///
/// Only the latest `capacity` ids are kept, the oldest one is forgotten first
#[derive(Clone)]
pub struct ProcessedMessages {
    inner: Arc<Mutex<Processed>>,
}

impl Default for ProcessedMessages {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PROCESSED_CAPACITY)
    }
}

impl ProcessedMessages {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Processed {
                ids: HashSet::new(),
                order: VecDeque::new(),
                capacity: capacity.max(1),
            })),
        }
    }

    pub async fn contains(&self, id: &MessageID) -> bool {
        self.inner.lock().await.ids.contains(id)
    }

    pub async fn insert(&self, id: MessageID) {
        let mut processed = self.inner.lock().await;
        if !processed.ids.insert(id.clone()) {
            return;
        }

        processed.order.push_back(id);
        while processed.order.len() > processed.capacity {
            if let Some(oldest) = processed.order.pop_front() {
                processed.ids.remove(&oldest);
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use rst_common::with_tokio::tokio;
    use rst_common::with_tokio::tokio::time::timeout;

    #[tokio::test]
    async fn test_same_thread_is_exclusive() {
        let locks = ThreadLocks::default();
        let thread_id = ThreadID::generate();

        let guard = locks.acquire(&thread_id).await;
        let blocked = timeout(Duration::from_millis(50), locks.acquire(&thread_id)).await;
        assert!(blocked.is_err());

        drop(guard);
        let acquired = timeout(Duration::from_millis(50), locks.acquire(&thread_id)).await;
        assert!(acquired.is_ok())
    }

    #[tokio::test]
    async fn test_other_threads_are_independent() {
        let locks = ThreadLocks::default();
        let _guard = locks.acquire(&ThreadID::generate()).await;

        let other = timeout(
            Duration::from_millis(50),
            locks.acquire(&ThreadID::generate()),
        )
        .await;
        assert!(other.is_ok())
    }

    #[tokio::test]
    async fn test_released_locks_are_dropped() {
        let locks = ThreadLocks::default();
        let first = ThreadID::generate();

        let guard = locks.acquire(&first).await;
        let _other = locks.acquire(&ThreadID::generate()).await;
        assert_eq!(locks.len().await, 2);

        drop(guard);
        let _third = locks.acquire(&ThreadID::generate()).await;
        assert_eq!(locks.len().await, 2)
    }

    #[tokio::test]
    async fn test_waiting_lock_is_kept() {
        let locks = ThreadLocks::default();
        let thread_id = ThreadID::generate();
        let guard = locks.acquire(&thread_id).await;

        let waiter = {
            let locks = locks.clone();
            let thread_id = thread_id.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&thread_id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let _other = locks.acquire(&ThreadID::generate()).await;
        assert_eq!(locks.len().await, 2);

        drop(guard);
        assert!(timeout(Duration::from_secs(1), waiter).await.is_ok())
    }

    #[tokio::test]
    async fn test_processed_messages_bounded() {
        let processed = ProcessedMessages::with_capacity(2);
        let ids: Vec<MessageID> = (0..3).map(|_| MessageID::generate()).collect();

        for id in ids.iter() {
            processed.insert(id.clone()).await;
        }

        assert_eq!(processed.len().await, 2);
        assert!(!processed.contains(&ids[0]).await);
        assert!(processed.contains(&ids[1]).await);
        assert!(processed.contains(&ids[2]).await)
    }

    #[tokio::test]
    async fn test_processed_messages() {
        let processed = ProcessedMessages::default();
        let id = MessageID::generate();
        assert!(!processed.contains(&id).await);

        processed.insert(id.clone()).await;
        assert!(processed.contains(&id).await)
    }
}
