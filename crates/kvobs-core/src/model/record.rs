use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::observable::{AttributeChange, ChangeCallbackWeak, ChangeKind, KeyValueObservable};
use super::registry::ObserverRegistry;
use super::value::Value;
use crate::core_types::SubscriptionToken;
use crate::errors::{KvoError, Result};

/// Dynamic observed object with a fixed set of declared attributes
///
/// Attributes are declared up front through [`RecordBuilder`]; reading or
/// mutating an undeclared attribute is `UnknownAttribute`. Every effective
/// mutation notifies observers twice (prior, then after) as required by
/// [`KeyValueObservable`]. Setting a value equal to the current one is a
/// no-op: no notification is sent.
pub struct Record {
    type_name: String,
    attributes: Mutex<BTreeMap<String, Option<Value>>>,
    observers: ObserverRegistry,
}

/// Builder declaring the attributes of a [`Record`]
#[derive(Debug)]
pub struct RecordBuilder {
    type_name: String,
    attributes: BTreeMap<String, Option<Value>>,
}

impl RecordBuilder {
    /// Declare an attribute with an initial value
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), Some(value.into()));
        self
    }

    /// Declare an attribute that starts out absent
    pub fn absent(mut self, key: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), None);
        self
    }

    pub fn build(self) -> Arc<Record> {
        Arc::new(Record {
            type_name: self.type_name,
            attributes: Mutex::new(self.attributes),
            observers: ObserverRegistry::new(),
        })
    }
}

impl Record {
    pub fn builder(type_name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            type_name: type_name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Current value of `key`
    ///
    /// # Errors
    ///
    /// `UnknownAttribute` if `key` was not declared.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.attributes()
            .get(key)
            .cloned()
            .ok_or_else(|| self.unknown(key))
    }

    /// Replace the whole value of `key`
    ///
    /// # Errors
    ///
    /// `UnknownAttribute` if `key` was not declared.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.assign(key, Some(value.into()))
    }

    /// Make `key` absent
    ///
    /// # Errors
    ///
    /// `UnknownAttribute` if `key` was not declared.
    pub fn clear(&self, key: &str) -> Result<()> {
        self.assign(key, None)
    }

    /// Replace the whole value of `key`; `None` makes it absent
    ///
    /// # Errors
    ///
    /// `UnknownAttribute` if `key` was not declared.
    pub fn assign(&self, key: &str, new: Option<Value>) -> Result<()> {
        let old = self.get(key)?;
        if old == new {
            return Ok(());
        }

        let change = AttributeChange::set(key, old, new.clone());
        self.observers.notify(&change.to_prior());
        self.attributes().insert(key.to_string(), new);
        self.observers.notify(&change);
        Ok(())
    }

    /// Insert `values` into the list held by `key`, starting at `index`
    ///
    /// An absent attribute is treated as an empty list.
    ///
    /// # Errors
    ///
    /// `UnknownAttribute`, `NotACollection`, or `IndexOutOfBounds` when
    /// `index` is past the end.
    pub fn insert(&self, key: &str, index: usize, values: Vec<Value>) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let len = self.list(key)?.len();
        if index > len {
            return Err(self.out_of_bounds(key, index, len));
        }

        let change = AttributeChange {
            key: key.to_string(),
            kind: ChangeKind::Insert,
            old: None,
            new: Some(Value::List(values.clone())),
            indexes: Some((index..index + values.len()).collect()),
            is_prior: false,
        };
        self.observers.notify(&change.to_prior());
        self.update_list(key, |items| {
            items.splice(index..index, values);
        });
        self.observers.notify(&change);
        Ok(())
    }

    /// Remove the elements at `indexes` from the list held by `key`
    ///
    /// # Errors
    ///
    /// `UnknownAttribute`, `NotACollection`, or `IndexOutOfBounds` for any
    /// index past the end.
    pub fn remove(&self, key: &str, indexes: &[usize]) -> Result<()> {
        let mut indexes = indexes.to_vec();
        indexes.sort_unstable();
        indexes.dedup();
        if indexes.is_empty() {
            return Ok(());
        }
        let items = self.list(key)?;
        if let Some(&bad) = indexes.iter().find(|&&i| i >= items.len()) {
            return Err(self.out_of_bounds(key, bad, items.len()));
        }

        let removed = indexes.iter().map(|&i| items[i].clone()).collect();
        let change = AttributeChange {
            key: key.to_string(),
            kind: ChangeKind::Remove,
            old: Some(Value::List(removed)),
            new: None,
            indexes: Some(indexes.clone()),
            is_prior: false,
        };
        self.observers.notify(&change.to_prior());
        self.update_list(key, |items| {
            for &i in indexes.iter().rev() {
                items.remove(i);
            }
        });
        self.observers.notify(&change);
        Ok(())
    }

    /// Replace the element at `index` of the list held by `key`
    ///
    /// # Errors
    ///
    /// `UnknownAttribute`, `NotACollection`, or `IndexOutOfBounds`.
    pub fn replace(&self, key: &str, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let items = self.list(key)?;
        let current = items
            .get(index)
            .ok_or_else(|| self.out_of_bounds(key, index, items.len()))?;
        if *current == value {
            return Ok(());
        }

        let change = AttributeChange {
            key: key.to_string(),
            kind: ChangeKind::Replace,
            old: Some(Value::List(vec![current.clone()])),
            new: Some(Value::List(vec![value.clone()])),
            indexes: Some(vec![index]),
            is_prior: false,
        };
        self.observers.notify(&change.to_prior());
        self.update_list(key, |items| items[index] = value);
        self.observers.notify(&change);
        Ok(())
    }

    /// Number of observer entries registered for `key`
    pub fn observer_count(&self, key: &str) -> usize {
        self.observers.observer_count(key)
    }

    fn list(&self, key: &str) -> Result<Vec<Value>> {
        match self.get(key)? {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => Ok(items),
            Some(_) => Err(KvoError::NotACollection {
                type_name: self.type_name.clone(),
                attribute: key.to_string(),
            }),
        }
    }

    fn update_list(&self, key: &str, f: impl FnOnce(&mut Vec<Value>)) {
        let mut attributes = self.attributes();
        let slot = attributes.entry(key.to_string()).or_insert(None);
        let mut items = match slot.take() {
            Some(Value::List(items)) => items,
            _ => Vec::new(),
        };
        f(&mut items);
        *slot = Some(Value::List(items));
    }

    fn attributes(&self) -> MutexGuard<'_, BTreeMap<String, Option<Value>>> {
        self.attributes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unknown(&self, key: &str) -> KvoError {
        KvoError::UnknownAttribute {
            type_name: self.type_name.clone(),
            attribute: key.to_string(),
        }
    }

    fn out_of_bounds(&self, key: &str, index: usize, len: usize) -> KvoError {
        KvoError::IndexOutOfBounds {
            attribute: key.to_string(),
            index,
            len,
        }
    }
}

impl KeyValueObservable for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn value_for_key(&self, key: &str) -> Result<Option<Value>> {
        self.get(key)
    }

    fn add_observer(&self, key: &str, observer: ChangeCallbackWeak) -> Result<SubscriptionToken> {
        if !self.attributes().contains_key(key) {
            return Err(self.unknown(key));
        }
        Ok(self.observers.add(key, observer))
    }

    fn remove_observer(&self, token: SubscriptionToken) {
        self.observers.remove(token);
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let attributes = self.attributes();
        f.debug_struct("Record")
            .field("type_name", &self.type_name)
            .field("attributes", &attributes.keys().collect::<Vec<_>>())
            .field("observers", &self.observers)
            .finish()
    }
}
