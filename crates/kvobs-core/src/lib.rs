//! KVObs Core - key-path change observation
//!
//! This crate bridges an object system that reports attribute changes to
//! callers that want to watch a dotted key path, including:
//! - The [`KeyValueObservable`] capability observed objects implement
//! - [`Record`], an in-memory observable object with scalar and list attributes
//! - Path resolution that follows intermediate objects as they are replaced
//! - [`KeyValueObserver`] handles with weak targets, options and disposal
//! - Structured logging and a stable error facility

pub use kvobs_core_types as core_types;

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod observation;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, KvoError, Result};
pub use model::{ChangeKind, KeyValueObservable, ObjectRef, Record, Value};
pub use observation::{
    ChangeRecord, KeyPath, KeyValueObserver, ObservationOptions, ObserverBag,
};
