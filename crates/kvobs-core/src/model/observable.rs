//! The capability an object needs in order to be observed by key path.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::core_types::SubscriptionToken;
use crate::errors::Result;

/// Kind of mutation an attribute went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The whole value was replaced
    Set,
    /// Elements were inserted into an ordered collection
    Insert,
    /// Elements were removed from an ordered collection
    Remove,
    /// Elements of an ordered collection were replaced in place
    Replace,
}

/// Raw change event emitted by an observed object for one attribute
///
/// For `Set`, `old`/`new` are the whole attribute values. For collection
/// kinds they are `Value::List`s of the affected elements, and `indexes`
/// lists their positions.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub key: String,
    pub kind: ChangeKind,
    pub old: Option<Value>,
    /// Always `None` on a prior event
    pub new: Option<Value>,
    pub indexes: Option<Vec<usize>>,
    /// True for the event sent before the mutation is applied
    pub is_prior: bool,
}

impl AttributeChange {
    /// The after event of a whole-value replacement
    pub fn set(key: impl Into<String>, old: Option<Value>, new: Option<Value>) -> Self {
        Self {
            key: key.into(),
            kind: ChangeKind::Set,
            old,
            new,
            indexes: None,
            is_prior: false,
        }
    }

    /// The prior event matching this change (new value stripped)
    pub fn to_prior(&self) -> Self {
        Self {
            new: None,
            is_prior: true,
            ..self.clone()
        }
    }
}

/// Observer callback as stored by observed objects
pub type ChangeCallback = dyn Fn(&AttributeChange) + Send + Sync;

/// Strong handle to an observer callback; whoever holds it keeps the observer alive
pub type ChangeCallbackRc = Arc<ChangeCallback>;

/// Non-owning handle to an observer callback, as registered with objects
pub type ChangeCallbackWeak = Weak<ChangeCallback>;

/// Read and subscribe to named attributes of an object
///
/// This is the whole surface the observation core consumes from an object
/// system.
///
/// # Delivery contract
///
/// For every mutation of an attribute, implementations must call each live
/// observer of that key twice: once with a prior event (`is_prior == true`)
/// before the new value becomes visible through [`value_for_key`], and once
/// with the after event once it is visible. Observers must be called
/// synchronously on the mutating thread and without holding any lock the
/// observer might need (observers read values, add and remove observers).
/// [`ObserverRegistry`](super::ObserverRegistry) implements this bookkeeping.
///
/// [`value_for_key`]: KeyValueObservable::value_for_key
pub trait KeyValueObservable: Send + Sync {
    /// Human-readable type name, used in errors and logs
    fn type_name(&self) -> &str;

    /// Current value of `key`; `Ok(None)` when the attribute is absent
    ///
    /// # Errors
    ///
    /// `UnknownAttribute` when the object has no attribute named `key`.
    fn value_for_key(&self, key: &str) -> Result<Option<Value>>;

    /// Register `observer` for changes to `key`
    ///
    /// The object must hold the observer weakly.
    ///
    /// # Errors
    ///
    /// `UnknownAttribute` when the object has no attribute named `key`.
    fn add_observer(&self, key: &str, observer: ChangeCallbackWeak) -> Result<SubscriptionToken>;

    /// Deregister a previously added observer; unknown tokens are ignored
    fn remove_observer(&self, token: SubscriptionToken);
}
