//! Per-segment subscription chain backing one observer.
//!
//! # Design
//!
//! For a key path `s0.s1...sn` rooted at object `o0`, the chain holds one
//! link per resolved segment: link *i* observes attribute `si` of object
//! `oi`, where `o(i+1)` is the current value of `si`. All objects are held
//! weakly. The chain stops early when an intermediate value is absent; the
//! observed (terminal) value is then absent too.
//!
//! When link *k* reports a change to an intermediate segment, links
//! *k+1..n* are torn down and the chain is rebuilt from the new value of
//! `sk`. The observer receives exactly one record for that mutation, or
//! none when the terminal value is the same before and after the rebind.
//!
//! # Invariants
//!
//! 1. Every link carries a unique epoch. Events from a link that is no
//!    longer part of the chain (torn down earlier in the same notification
//!    pass) are ignored.
//! 2. The chain lock is never held while the sink runs, so the sink may
//!    dispose the chain or mutate observed objects.
//! 3. After `dispose()` returns, no link is registered with any live object
//!    and no further record is produced.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::change::ChangeRecord;
use super::key_path::KeyPath;
use super::options::ObservationOptions;
use crate::core_types::{ObservationId, SubscriptionToken};
use crate::errors::{KvoError, Result};
use crate::model::{AttributeChange, ChangeCallbackRc, ObjectRef, Value, WeakObjectRef};

/// Receiver of the records a chain produces
pub type RecordSink = Box<dyn Fn(&ChangeRecord) + Send + Sync>;

/// One live subscription: attribute `segment` of `node`
struct Link {
    node: WeakObjectRef,
    token: SubscriptionToken,
    epoch: u64,
    /// Strong half of the callback the node holds weakly
    _callback: ChangeCallbackRc,
}

/// Terminal value seen by an intermediate prior event, kept for the matching after event
struct PendingRebind {
    old: Option<Value>,
    prior_sent: bool,
}

#[derive(Default)]
struct ChainState {
    links: Vec<Link>,
    pending: Option<PendingRebind>,
    next_epoch: u64,
    disposed: bool,
}

/// Resolved subscription chain for one key path
pub struct PathResolver {
    id: ObservationId,
    key_path: KeyPath,
    options: ObservationOptions,
    state: Mutex<ChainState>,
    sink: RecordSink,
    me: Weak<PathResolver>,
}

impl PathResolver {
    /// Walk `key_path` from `root`, subscribing to every segment
    ///
    /// # Errors
    ///
    /// `UnknownAttribute` when a segment does not exist on the object it is
    /// applied to, `NotAnObject` when an intermediate segment holds a value
    /// that is neither an object nor absent. No subscription survives an
    /// error.
    pub fn resolve(
        id: ObservationId,
        root: &ObjectRef,
        key_path: KeyPath,
        options: ObservationOptions,
        sink: RecordSink,
    ) -> Result<Arc<Self>> {
        let resolver = Arc::new_cyclic(|me| Self {
            id,
            key_path,
            options,
            state: Mutex::new(ChainState::default()),
            sink,
            me: me.clone(),
        });

        let resolved = resolver.extend(&mut resolver.state(), 0, root.clone());
        if let Err(err) = resolved {
            resolver.dispose();
            return Err(err);
        }

        tracing::debug!(
            observation_id = %resolver.id,
            key_path = %resolver.key_path,
            chain_len = resolver.chain_len(),
            "resolved chain"
        );
        Ok(resolver)
    }

    pub fn key_path(&self) -> &KeyPath {
        &self.key_path
    }

    pub fn options(&self) -> ObservationOptions {
        self.options
    }

    /// Current value at the end of the path; absent when the chain is broken
    pub fn terminal_value(&self) -> Option<Value> {
        let state = self.state();
        self.read_terminal(&state)
    }

    /// Number of segments currently subscribed
    pub fn chain_len(&self) -> usize {
        self.state().links.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    /// Tear down every link; returns false if the chain was already disposed
    pub fn dispose(&self) -> bool {
        let links = {
            let mut state = self.state();
            if state.disposed {
                return false;
            }
            state.disposed = true;
            state.pending = None;
            std::mem::take(&mut state.links)
        };
        teardown(links);
        true
    }

    /// Subscribe segments `index..` starting at `node`
    fn extend(&self, state: &mut ChainState, mut index: usize, mut node: ObjectRef) -> Result<()> {
        let last = self.key_path.len() - 1;
        loop {
            let link = self.subscribe(state, &node, index)?;
            state.links.push(link);
            if index == last {
                return Ok(());
            }

            let segment = &self.key_path.segments()[index];
            match node.value_for_key(segment)? {
                None => return Ok(()),
                Some(Value::Object(next)) => {
                    node = next;
                    index += 1;
                }
                Some(_) => {
                    return Err(KvoError::NotAnObject {
                        key_path: self.key_path.to_string(),
                        segment: segment.clone(),
                    })
                }
            }
        }
    }

    fn subscribe(&self, state: &mut ChainState, node: &ObjectRef, index: usize) -> Result<Link> {
        let epoch = state.next_epoch;
        state.next_epoch += 1;

        let me = self.me.clone();
        let callback: ChangeCallbackRc = Arc::new(move |change: &AttributeChange| {
            if let Some(resolver) = me.upgrade() {
                resolver.handle_change(index, epoch, change);
            }
        });
        let token = node.add_observer(&self.key_path.segments()[index], Arc::downgrade(&callback))?;

        Ok(Link {
            node: node.downgrade(),
            token,
            epoch,
            _callback: callback,
        })
    }

    fn handle_change(&self, index: usize, epoch: u64, change: &AttributeChange) {
        let record = {
            let mut state = self.state();
            if state.disposed || state.links.get(index).map(|l| l.epoch) != Some(epoch) {
                return;
            }
            self.record_for(&mut state, index, change)
        };

        if let Some(record) = record {
            (self.sink)(&record);
        }
    }

    fn record_for(
        &self,
        state: &mut ChainState,
        index: usize,
        change: &AttributeChange,
    ) -> Option<ChangeRecord> {
        let options = self.options;
        if index == self.key_path.len() - 1 {
            if change.is_prior && !options.prior {
                return None;
            }
            return Some(ChangeRecord::from_terminal(change, options));
        }

        if change.is_prior {
            let old = self.read_terminal(state);
            state.pending = Some(PendingRebind {
                old: old.clone(),
                prior_sent: options.prior,
            });
            return options
                .prior
                .then(|| ChangeRecord::before_rebind(old, options));
        }

        let pending = state.pending.take();
        self.rebind(state, index);
        let new = self.read_terminal(state);
        match pending {
            // A delivered prior record is always followed by its after record.
            Some(pending) if pending.old == new && !pending.prior_sent => None,
            Some(pending) => Some(ChangeRecord::after_rebind(pending.old, new, options)),
            None => Some(ChangeRecord::after_rebind(None, new, options)),
        }
    }

    /// Rebuild links past `index` against the current value of segment `index`
    ///
    /// Runs inside a mutation of an observed object, so resolution failures
    /// cannot be reported to a caller; they leave the terminal value absent.
    fn rebind(&self, state: &mut ChainState, index: usize) {
        let stale = state.links.split_off(index + 1);
        teardown(stale);

        let segment = &self.key_path.segments()[index];
        let resolved = match state.links[index].node.upgrade() {
            None => Ok(()),
            Some(node) => match node.value_for_key(segment) {
                Ok(Some(Value::Object(next))) => self.extend(state, index + 1, next),
                Ok(Some(_)) => Err(KvoError::NotAnObject {
                    key_path: self.key_path.to_string(),
                    segment: segment.clone(),
                }),
                Ok(None) => Ok(()),
                Err(err) => Err(err),
            },
        };

        match resolved {
            Ok(()) => tracing::debug!(
                observation_id = %self.id,
                key_path = %self.key_path,
                segment = %segment,
                chain_len = state.links.len(),
                "rebound chain"
            ),
            Err(err) => tracing::warn!(
                observation_id = %self.id,
                key_path = %self.key_path,
                segment = %segment,
                chain_len = state.links.len(),
                error = %err,
                "could not rebind chain, observed value is absent"
            ),
        }
    }

    fn read_terminal(&self, state: &ChainState) -> Option<Value> {
        if state.links.len() != self.key_path.len() {
            return None;
        }
        let node = state.links.last()?.node.upgrade()?;
        node.value_for_key(self.key_path.terminal()).ok().flatten()
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn teardown(links: Vec<Link>) {
    for link in links {
        if let Some(node) = link.node.upgrade() {
            node.remove_observer(link.token);
        }
    }
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("PathResolver")
            .field("id", &self.id)
            .field("key_path", &self.key_path)
            .field("chain_len", &state.links.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}
