use std::collections::HashSet;

use super::observer::KeyValueObserver;

/// Set of observers owned together, e.g. by a view that watches several paths
///
/// Observers are keyed by identity, so inserting a clone of an observer that
/// is already present is a no-op. Dropping the bag disposes every observer it
/// holds the last clone of.
#[derive(Debug, Default)]
pub struct ObserverBag {
    observers: HashSet<KeyValueObserver>,
}

impl ObserverBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the observer (or a clone of it) was already held
    pub fn insert(&mut self, observer: KeyValueObserver) -> bool {
        self.observers.insert(observer)
    }

    /// Stop holding `observer` without disposing it
    pub fn remove(&mut self, observer: &KeyValueObserver) -> bool {
        self.observers.remove(observer)
    }

    pub fn contains(&self, observer: &KeyValueObserver) -> bool {
        self.observers.contains(observer)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValueObserver> {
        self.observers.iter()
    }

    /// Dispose every held observer, including clones held elsewhere, and empty the bag
    pub fn dispose_all(&mut self) {
        for observer in self.observers.drain() {
            observer.dispose();
        }
    }
}

impl Extend<KeyValueObserver> for ObserverBag {
    fn extend<T: IntoIterator<Item = KeyValueObserver>>(&mut self, iter: T) {
        self.observers.extend(iter);
    }
}

impl FromIterator<KeyValueObserver> for ObserverBag {
    fn from_iter<T: IntoIterator<Item = KeyValueObserver>>(iter: T) -> Self {
        Self {
            observers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::observation::ChangeRecord;

    #[test]
    fn test_clone_is_not_inserted_twice() {
        let person = Record::builder("Person").attribute("name", "Alice").build();
        let observer = KeyValueObserver::observe(&person, "name", |_: &ChangeRecord| {}).unwrap();

        let mut bag = ObserverBag::new();
        assert!(bag.insert(observer.clone()));
        assert!(!bag.insert(observer.clone()));
        assert_eq!(bag.len(), 1);
        assert!(bag.contains(&observer));
    }

    #[test]
    fn test_dispose_all_reaches_outside_clones() {
        let person = Record::builder("Person")
            .attribute("name", "Alice")
            .attribute("age", 30_i64)
            .build();
        let name = KeyValueObserver::observe(&person, "name", |_: &ChangeRecord| {}).unwrap();
        let age = KeyValueObserver::observe(&person, "age", |_: &ChangeRecord| {}).unwrap();

        let mut bag: ObserverBag = [name.clone(), age.clone()].into_iter().collect();
        bag.dispose_all();

        assert!(bag.is_empty());
        assert!(name.is_disposed());
        assert!(age.is_disposed());
        assert_eq!(person.observer_count("name"), 0);
        assert_eq!(person.observer_count("age"), 0);
    }

    #[test]
    fn test_remove_keeps_observer_alive() {
        let person = Record::builder("Person").attribute("name", "Alice").build();
        let observer = KeyValueObserver::observe(&person, "name", |_: &ChangeRecord| {}).unwrap();
        let mut bag = ObserverBag::new();
        bag.insert(observer.clone());

        assert!(bag.remove(&observer));
        assert!(!observer.is_disposed());
        assert_eq!(person.observer_count("name"), 1);
    }
}
