//! Per-user serialization of read-modify-write cycles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Registry of one async mutex per user id.
///
/// A slot exists only while some task holds or waits on it; the last
/// [`UserGuard`] to drop removes it.
#[derive(Default)]
pub struct UserLocks {
    slots: Slots,
}

/// Proof that the holder owns the lock for `user_id`.
pub struct UserGuard {
    user_id: String,
    slots: Slots,
    guard: OwnedMutexGuard<()>,
}

impl UserGuard {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        // Clones are only taken under the registry lock, so 2 means the map
        // entry plus this guard and no waiters.
        let idle = slots.get(&self.user_id).is_some_and(|slot| {
            Arc::ptr_eq(slot, OwnedMutexGuard::mutex(&self.guard)) && Arc::strong_count(slot) == 2
        });
        if idle {
            slots.remove(&self.user_id);
        }
    }
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(
            slots
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    /// Wait for exclusive access to `user_id`'s records.
    pub async fn lock(&self, user_id: &str) -> UserGuard {
        let guard = self.slot(user_id).lock_owned().await;
        UserGuard {
            user_id: user_id.to_string(),
            slots: Arc::clone(&self.slots),
            guard,
        }
    }

    /// Number of users currently holding or waiting on a lock
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
