//! Observed-object model
//!
//! The capability the observation core consumes from an object system
//! ([`KeyValueObservable`]), the values attributes hold, the raw change
//! events objects emit, and [`Record`], a ready-made observable object.

pub mod observable;
pub mod record;
pub mod registry;
pub mod value;

pub use observable::{
    AttributeChange, ChangeCallback, ChangeCallbackRc, ChangeCallbackWeak, ChangeKind,
    KeyValueObservable,
};
pub use record::{Record, RecordBuilder};
pub use registry::ObserverRegistry;
pub use value::{ObjectRef, Value, WeakObjectRef};
