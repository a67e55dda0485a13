//! Keyed coalescing timer.
//!
//! `schedule` cancels any pending callback for the same key, so only the last
//! call inside the delay window fires. Callbacks run as local tasks, so the
//! timer must be used from within a `tokio::task::LocalSet`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

pub struct CoalescingTimer<K> {
    pending: RefCell<HashMap<K, JoinHandle<()>>>,
}

impl<K> Default for CoalescingTimer<K> {
    fn default() -> Self {
        Self {
            pending: RefCell::new(HashMap::new()),
        }
    }
}

impl<K> CoalescingTimer<K>
where
    K: Eq + Hash + Copy + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` after `delay` unless another call for `key` arrives first.
    pub fn schedule<F>(&self, key: K, delay: Duration, f: F)
    where
        F: FnOnce() + 'static,
    {
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            f();
        });
        if let Some(previous) = self.pending.borrow_mut().insert(key, handle) {
            if !previous.is_finished() {
                trace!(?key, "Coalesced pending timer");
            }
            previous.abort();
        }
    }

    /// Cancel the pending callback for `key`. Returns true if one was pending.
    pub fn cancel(&self, key: K) -> bool {
        match self.pending.borrow_mut().remove(&key) {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self, key: K) -> bool {
        self.pending
            .borrow()
            .get(&key)
            .is_some_and(|h| !h.is_finished())
    }
}

impl<K> Drop for CoalescingTimer<K> {
    fn drop(&mut self) {
        for (_, handle) in self.pending.get_mut().drain() {
            handle.abort();
        }
    }
}
