use super::options::ObservationOptions;
use crate::model::{AttributeChange, ChangeKind, Value};

/// Normalized notification delivered to an observer's block
///
/// `None` in `old_value`/`new_value` means either "not requested" or
/// "absent"; the observer's options tell which.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    /// Set only with the `old` option, never on the initial record
    pub old_value: Option<Value>,
    /// Set only with the `new` option (or on the initial record), never on a prior record
    pub new_value: Option<Value>,
    /// Positions affected by an ordered-collection insert, remove or replace
    pub indexes: Option<Vec<usize>>,
    /// The extra record sent before a change takes effect
    pub is_prior: bool,
    /// The record sent while the observer was being created
    pub is_initial: bool,
}

impl ChangeRecord {
    /// Record sent once at creation; always carries the current value
    pub(crate) fn initial(current: Option<Value>) -> Self {
        Self {
            kind: ChangeKind::Set,
            old_value: None,
            new_value: current,
            indexes: None,
            is_prior: false,
            is_initial: true,
        }
    }

    /// Record for a change to the observed attribute itself
    pub(crate) fn from_terminal(change: &AttributeChange, options: ObservationOptions) -> Self {
        Self {
            kind: change.kind,
            old_value: change.old.clone().filter(|_| options.old),
            new_value: change
                .new
                .clone()
                .filter(|_| options.new && !change.is_prior),
            indexes: change.indexes.clone(),
            is_prior: change.is_prior,
            is_initial: false,
        }
    }

    /// Prior record for a change to an intermediate segment
    pub(crate) fn before_rebind(old: Option<Value>, options: ObservationOptions) -> Self {
        Self {
            kind: ChangeKind::Set,
            old_value: old.filter(|_| options.old),
            new_value: None,
            indexes: None,
            is_prior: true,
            is_initial: false,
        }
    }

    /// Record for a change to an intermediate segment, once the chain was rebuilt
    pub(crate) fn after_rebind(
        old: Option<Value>,
        new: Option<Value>,
        options: ObservationOptions,
    ) -> Self {
        Self {
            kind: ChangeKind::Set,
            old_value: old.filter(|_| options.old),
            new_value: new.filter(|_| options.new),
            indexes: None,
            is_prior: false,
            is_initial: false,
        }
    }
}
