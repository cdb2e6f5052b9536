use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::change::ChangeRecord;
use super::key_path::KeyPath;
use super::options::ObservationOptions;
use super::resolver::PathResolver;
use crate::core_types::schema::{OP_DISPOSE, OP_OBSERVE};
use crate::core_types::ObservationId;
use crate::errors::{KvoError, Result};
use crate::model::{ObjectRef, Value, WeakObjectRef};
use crate::{log_op_end, log_op_error, log_op_start};

/// Block invoked with each change record
pub type ObserverBlock = Arc<dyn Fn(&ChangeRecord) + Send + Sync>;

/// Observation of one key path on one target object
///
/// Observation starts inside [`KeyValueObserver::new`] and lasts until
/// [`dispose`](KeyValueObserver::dispose) is called or the last clone of the
/// observer is dropped. Records are delivered synchronously on the thread
/// that mutated the observed object.
///
/// Cloning does not create a second subscription: all clones are the same
/// observer, compare equal, hash alike, and disposing any of them disposes
/// the subscription. This makes observers usable as map keys.
///
/// The target is held weakly. Once it is gone the observer stays valid but
/// never fires again. A block that captures a clone of its own observer keeps
/// it alive forever unless `dispose()` is called.
#[derive(Clone)]
pub struct KeyValueObserver {
    inner: Arc<ObserverInner>,
}

struct ObserverInner {
    id: ObservationId,
    target: WeakObjectRef,
    key_path: KeyPath,
    options: ObservationOptions,
    block: ObserverBlock,
    resolver: Arc<PathResolver>,
    disposed: Arc<AtomicBool>,
}

impl ObserverInner {
    fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.resolver.dispose();
        true
    }
}

impl Drop for ObserverInner {
    fn drop(&mut self) {
        if self.dispose() {
            tracing::debug!(observation_id = %self.id, key_path = %self.key_path, "observer dropped");
        }
    }
}

impl KeyValueObserver {
    /// Start observing `key_path` on `target`
    ///
    /// With `options.initial` set, `block` runs once with the current value
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Every failure is in the invalid-path class: the path is empty or
    /// malformed, a segment is not an attribute of the object it is applied
    /// to, or an intermediate segment holds a non-object value.
    pub fn new<P>(
        target: impl Into<ObjectRef>,
        key_path: P,
        options: ObservationOptions,
        block: impl Fn(&ChangeRecord) + Send + Sync + 'static,
    ) -> Result<Self>
    where
        P: TryInto<KeyPath>,
        KvoError: From<P::Error>,
    {
        let started = Instant::now();
        let id = ObservationId::new();
        let key_path = match key_path.try_into() {
            Ok(key_path) => key_path,
            Err(err) => {
                let err = KvoError::from(err);
                log_op_error!(
                    OP_OBSERVE,
                    err.clone(),
                    duration_ms = elapsed_ms(started),
                    observation_id = %id
                );
                return Err(err);
            }
        };

        log_op_start!(OP_OBSERVE, observation_id = %id, key_path = %key_path);
        match Self::arm(id.clone(), target.into(), key_path.clone(), options, Arc::new(block)) {
            Ok(observer) => {
                log_op_end!(
                    OP_OBSERVE,
                    duration_ms = elapsed_ms(started),
                    observation_id = %id,
                    key_path = %key_path
                );
                Ok(observer)
            }
            Err(err) => {
                log_op_error!(
                    OP_OBSERVE,
                    err.clone(),
                    duration_ms = elapsed_ms(started),
                    observation_id = %id,
                    key_path = %key_path
                );
                Err(err)
            }
        }
    }

    /// Start observing without any options: records carry only the change kind
    ///
    /// # Errors
    ///
    /// Same as [`KeyValueObserver::new`].
    pub fn observe<P>(
        target: impl Into<ObjectRef>,
        key_path: P,
        block: impl Fn(&ChangeRecord) + Send + Sync + 'static,
    ) -> Result<Self>
    where
        P: TryInto<KeyPath>,
        KvoError: From<P::Error>,
    {
        Self::new(target, key_path, ObservationOptions::NONE, block)
    }

    fn arm(
        id: ObservationId,
        target: ObjectRef,
        key_path: KeyPath,
        options: ObservationOptions,
        block: ObserverBlock,
    ) -> Result<Self> {
        let disposed = Arc::new(AtomicBool::new(false));
        let sink = {
            let block = Arc::clone(&block);
            let disposed = Arc::clone(&disposed);
            Box::new(move |record: &ChangeRecord| {
                if !disposed.load(Ordering::Acquire) {
                    block(record);
                }
            })
        };

        let resolver = PathResolver::resolve(id.clone(), &target, key_path.clone(), options, sink)?;
        let observer = Self {
            inner: Arc::new(ObserverInner {
                id,
                target: target.downgrade(),
                key_path,
                options,
                block,
                resolver,
                disposed,
            }),
        };

        if options.initial {
            let record = ChangeRecord::initial(observer.inner.resolver.terminal_value());
            (observer.inner.block)(&record);
        }
        Ok(observer)
    }

    /// Stop observing; later calls, and calls after the target died, are no-ops
    ///
    /// May be called from within the observer's own block.
    pub fn dispose(&self) {
        let started = Instant::now();
        let inner = &self.inner;
        log_op_start!(OP_DISPOSE, observation_id = %inner.id, key_path = %inner.key_path);
        let disposed_now = inner.dispose();
        log_op_end!(
            OP_DISPOSE,
            duration_ms = elapsed_ms(started),
            observation_id = %inner.id,
            key_path = %inner.key_path,
            already_disposed = !disposed_now
        );
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// The observed object, if it is still alive
    pub fn target(&self) -> Option<ObjectRef> {
        self.inner.target.upgrade()
    }

    pub fn key_path(&self) -> &KeyPath {
        &self.inner.key_path
    }

    pub fn options(&self) -> ObservationOptions {
        self.inner.options
    }

    pub fn block(&self) -> &ObserverBlock {
        &self.inner.block
    }

    pub fn id(&self) -> &ObservationId {
        &self.inner.id
    }

    /// Current value at the end of the key path; absent once disposed
    pub fn value(&self) -> Option<Value> {
        if self.is_disposed() {
            return None;
        }
        self.inner.resolver.terminal_value()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl PartialEq for KeyValueObserver {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for KeyValueObserver {}

impl Hash for KeyValueObserver {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as usize).hash(state);
    }
}

impl std::fmt::Debug for KeyValueObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueObserver")
            .field("id", &self.inner.id)
            .field("target", &self.inner.target)
            .field("key_path", &self.inner.key_path)
            .field("options", &self.inner.options)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[test]
    fn test_accessors_reflect_configuration() {
        let person = Record::builder("Person").attribute("name", "Alice").build();
        let observer = KeyValueObserver::new(
            &person,
            "name",
            ObservationOptions::OLD_NEW,
            |_: &ChangeRecord| {},
        )
        .unwrap();

        assert_eq!(observer.key_path().to_string(), "name");
        assert_eq!(observer.options(), ObservationOptions::OLD_NEW);
        assert!(observer.target().is_some_and(|t| t.is(&person)));
        assert_eq!(observer.value(), Some(Value::from("Alice")));
        assert!(!observer.is_disposed());
    }

    #[test]
    fn test_clones_are_the_same_observer() {
        let person = Record::builder("Person").attribute("name", "Alice").build();
        let observer = KeyValueObserver::observe(&person, "name", |_: &ChangeRecord| {}).unwrap();
        let alias = observer.clone();
        let other = KeyValueObserver::observe(&person, "name", |_: &ChangeRecord| {}).unwrap();

        assert_eq!(observer, alias);
        assert_ne!(observer, other);
        let set: HashSet<_> = [observer.clone(), alias.clone(), other.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(person.observer_count("name"), 2);
    }

    #[test]
    fn test_dropping_last_clone_disposes() {
        let person = Record::builder("Person").attribute("name", "Alice").build();
        let observer = KeyValueObserver::observe(&person, "name", |_: &ChangeRecord| {}).unwrap();
        let alias = observer.clone();

        drop(observer);
        assert_eq!(person.observer_count("name"), 1);
        drop(alias);
        assert_eq!(person.observer_count("name"), 0);
    }

    #[test]
    fn test_block_can_dispose_its_own_observer() {
        let person = Record::builder("Person").attribute("count", 0_i64).build();
        let slot: Arc<Mutex<Option<KeyValueObserver>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(0));

        let block_slot = Arc::clone(&slot);
        let block_calls = Arc::clone(&calls);
        let observer = KeyValueObserver::observe(&person, "count", move |_: &ChangeRecord| {
            *block_calls.lock().unwrap() += 1;
            if let Some(me) = block_slot.lock().unwrap().take() {
                me.dispose();
            }
        })
        .unwrap();
        *slot.lock().unwrap() = Some(observer.clone());

        person.set("count", 1_i64).unwrap();
        person.set("count", 2_i64).unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(observer.is_disposed());
        assert_eq!(observer.value(), None);
    }
}
