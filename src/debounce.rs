//! Keyed debouncing on the Tokio timer.
//!
//! Each key has at most one pending task. Scheduling again for the same key
//! aborts the pending one, so only the last action inside the window runs.
//! A task leaves the registry the moment its delay elapses; from then on
//! its action runs to completion and can no longer be cancelled.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

type Registry<K> = Arc<Mutex<HashMap<K, Pending>>>;

fn lock<K>(tasks: &Registry<K>) -> MutexGuard<'_, HashMap<K, Pending>> {
    tasks
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registry of cancellable delayed tasks, one per key.
pub struct Debouncer<K> {
    tasks: Registry<K>,
    generation: AtomicU64,
}

impl<K> Default for Debouncer<K> {
    fn default() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay`, replacing any task still pending for `key`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, key: K, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.tasks);
        let task_key = key.clone();

        // Held across the spawn so the new task cannot look itself up
        // before it has been registered.
        let mut tasks = lock(&self.tasks);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut tasks = lock(&registry);
                let current = tasks.get(&task_key).map(|pending| pending.generation);
                if current != Some(generation) {
                    // Superseded between waking up and taking the lock.
                    return;
                }
                tasks.remove(&task_key);
            }
            action.await;
        });
        if let Some(previous) = tasks.insert(key, Pending { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Abort the pending task for `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match lock(&self.tasks).remove(key) {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a task for `key` is still waiting for its delay.
    pub fn is_pending(&self, key: &K) -> bool {
        lock(&self.tasks).contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.tasks).len()
    }

    /// Abort every pending task.
    pub fn cancel_all(&self) {
        for (_, pending) in lock(&self.tasks).drain() {
            pending.handle.abort();
        }
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        for (_, pending) in lock(&self.tasks).drain() {
            pending.handle.abort();
        }
    }
}
