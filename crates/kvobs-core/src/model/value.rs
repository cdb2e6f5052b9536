use std::fmt;
use std::sync::{Arc, Weak};

use super::observable::KeyValueObservable;

/// Attribute value held by an observed object
///
/// Absence ("nil") is not a variant: attributes are read as `Option<Value>`
/// and `None` means absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Ordered collection
    List(Vec<Value>),
    /// Reference to another observed object; the only value a key path can descend into
    Object(ObjectRef),
}

impl Value {
    /// Convenience constructor for object values
    pub fn object<T: KeyValueObservable + 'static>(object: &Arc<T>) -> Self {
        Value::Object(ObjectRef::from(object))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}

/// Strong, type-erased reference to an observed object
///
/// Equality and hashing are by identity (same allocation), never by content.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn KeyValueObservable>);

impl ObjectRef {
    /// Wrap an already type-erased object
    pub fn from_dyn(object: Arc<dyn KeyValueObservable>) -> Self {
        Self(object)
    }

    /// Form a non-owning reference to the same object
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(&self.0))
    }

    /// Identity comparison; ignores vtable differences of the fat pointer
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.addr() == other.addr()
    }

    /// True when this reference points at `object`
    pub fn is<T: KeyValueObservable + 'static>(&self, object: &Arc<T>) -> bool {
        self.addr() == Arc::as_ptr(object) as *const () as usize
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl std::ops::Deref for ObjectRef {
    type Target = dyn KeyValueObservable;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl<T: KeyValueObservable + 'static> From<Arc<T>> for ObjectRef {
    fn from(object: Arc<T>) -> Self {
        Self(object)
    }
}

impl<T: KeyValueObservable + 'static> From<&Arc<T>> for ObjectRef {
    fn from(object: &Arc<T>) -> Self {
        Self(Arc::clone(object) as Arc<dyn KeyValueObservable>)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl std::hash::Hash for ObjectRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.0.type_name(), self.addr())
    }
}

/// Non-owning reference to an observed object
///
/// Upgrading races safely with deallocation: it yields either a live
/// [`ObjectRef`] or `None`.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<dyn KeyValueObservable>);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(object) => write!(f, "Weak({:?})", object),
            None => write!(f, "Weak(<gone>)"),
        }
    }
}
