//! Key-path observation
//!
//! A [`KeyValueObserver`] watches a dotted [`KeyPath`] starting at a target
//! object. The [`PathResolver`] behind it subscribes to every object along the
//! path and re-subscribes whenever an intermediate segment changes, so the
//! observer always reports the value currently at the end of the path.

pub mod bag;
pub mod change;
pub mod key_path;
pub mod observer;
pub mod options;
pub mod resolver;

pub use bag::ObserverBag;
pub use change::ChangeRecord;
pub use key_path::KeyPath;
pub use observer::{KeyValueObserver, ObserverBlock};
pub use options::ObservationOptions;
pub use resolver::{PathResolver, RecordSink};
