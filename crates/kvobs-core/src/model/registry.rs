//! Observer bookkeeping for [`KeyValueObservable`](super::KeyValueObservable) implementers.
//!
//! # Design
//!
//! Observers are stored as `Weak` callbacks keyed by a [`SubscriptionToken`].
//! Dead entries (callbacks whose owner dropped them without removing them)
//! are pruned lazily during [`ObserverRegistry::notify`].
//!
//! # Failure Modes
//!
//! - **Re-entrant notify**: observers may add or remove observers, and may
//!   mutate the object again, while being notified. The registry lock is
//!   never held during a callback, so this cannot deadlock. Observers added
//!   during a notification pass are not called for that pass.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::observable::{AttributeChange, ChangeCallbackRc, ChangeCallbackWeak};
use crate::core_types::SubscriptionToken;

struct ObserverEntry {
    token: SubscriptionToken,
    key: String,
    callback: ChangeCallbackWeak,
}

/// Per-object set of attribute observers
#[derive(Default)]
pub struct ObserverRegistry {
    entries: Mutex<Vec<ObserverEntry>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `key`; observers are notified in registration order
    pub fn add(&self, key: &str, callback: ChangeCallbackWeak) -> SubscriptionToken {
        let token = SubscriptionToken::new();
        self.entries().push(ObserverEntry {
            token,
            key: key.to_string(),
            callback,
        });
        token
    }

    /// Remove the entry registered under `token`; returns whether one existed
    pub fn remove(&self, token: SubscriptionToken) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|e| e.token != token);
        entries.len() != before
    }

    /// Number of registered entries for `key`, including dead ones not yet pruned
    pub fn observer_count(&self, key: &str) -> usize {
        self.entries().iter().filter(|e| e.key == key).count()
    }

    /// Total number of registered entries, including dead ones not yet pruned
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `change` to the live observers of `change.key` and prune dead ones
    pub fn notify(&self, change: &AttributeChange) {
        // Collect live callbacks first so none runs under the lock.
        let callbacks: Vec<ChangeCallbackRc> = {
            let mut entries = self.entries();
            entries.retain(|e| e.callback.strong_count() > 0);
            entries
                .iter()
                .filter(|e| e.key == change.key)
                .filter_map(|e| e.callback.upgrade())
                .collect()
        };

        for callback in &callbacks {
            callback(change);
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<ObserverEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observer_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, ChangeCallbackRc) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let callback: ChangeCallbackRc = Arc::new(move |_change: &AttributeChange| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn test_notify_only_matching_key() {
        let registry = ObserverRegistry::new();
        let (name_count, name_cb) = counter();
        let (age_count, age_cb) = counter();
        registry.add("name", Arc::downgrade(&name_cb));
        registry.add("age", Arc::downgrade(&age_cb));

        registry.notify(&AttributeChange::set("name", None, None));

        assert_eq!(name_count.load(Ordering::SeqCst), 1);
        assert_eq!(age_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_stops_delivery() {
        let registry = ObserverRegistry::new();
        let (count, cb) = counter();
        let token = registry.add("name", Arc::downgrade(&cb));

        assert!(registry.remove(token));
        assert!(!registry.remove(token));

        registry.notify(&AttributeChange::set("name", None, None));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dropped_callback_is_pruned_on_notify() {
        let registry = ObserverRegistry::new();
        let (_count, cb) = counter();
        registry.add("name", Arc::downgrade(&cb));
        drop(cb);

        // Dead entry not yet pruned.
        assert_eq!(registry.observer_count("name"), 1);

        registry.notify(&AttributeChange::set("name", None, None));
        assert_eq!(registry.observer_count("name"), 0);
    }

    #[test]
    fn test_notification_order_is_registration_order() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let callbacks: Vec<ChangeCallbackRc> = ['A', 'B', 'C']
            .into_iter()
            .map(|tag| {
                let log = Arc::clone(&log);
                Arc::new(move |_: &AttributeChange| log.lock().unwrap().push(tag)) as ChangeCallbackRc
            })
            .collect();
        for cb in &callbacks {
            registry.add("name", Arc::downgrade(cb));
        }

        registry.notify(&AttributeChange::set("name", None, None));
        assert_eq!(*log.lock().unwrap(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn test_callback_may_remove_itself() {
        let registry = Arc::new(ObserverRegistry::new());
        let token_slot: Arc<Mutex<Option<SubscriptionToken>>> = Arc::new(Mutex::new(None));

        let reg = Arc::clone(&registry);
        let slot = Arc::clone(&token_slot);
        let cb: ChangeCallbackRc = Arc::new(move |_: &AttributeChange| {
            if let Some(token) = slot.lock().unwrap().take() {
                reg.remove(token);
            }
        });
        let token = registry.add("name", Arc::downgrade(&cb));
        *token_slot.lock().unwrap() = Some(token);

        registry.notify(&AttributeChange::set("name", None, None));
        assert!(registry.is_empty());
    }
}
