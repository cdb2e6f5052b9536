use serde::{Deserialize, Serialize};

/// Independent flags selecting what an observer is told
///
/// All combinations are valid. Missing fields deserialize as `false`, so an
/// option set can be written in configuration as e.g. `{"old": true}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservationOptions {
    /// Deliver the value before the change as `old_value`
    pub old: bool,
    /// Deliver the value after the change as `new_value`
    pub new: bool,
    /// Deliver one extra record before each change, flagged `is_prior`
    pub prior: bool,
    /// Deliver one record with the current value while the observer is created
    pub initial: bool,
}

impl ObservationOptions {
    pub const NONE: Self = Self {
        old: false,
        new: false,
        prior: false,
        initial: false,
    };

    pub const OLD_NEW: Self = Self::NONE.with_old().with_new();

    pub const ALL: Self = Self::OLD_NEW.with_prior().with_initial();

    pub const fn with_old(self) -> Self {
        Self { old: true, ..self }
    }

    pub const fn with_new(self) -> Self {
        Self { new: true, ..self }
    }

    pub const fn with_prior(self) -> Self {
        Self { prior: true, ..self }
    }

    pub const fn with_initial(self) -> Self {
        Self { initial: true, ..self }
    }

    /// Union of two option sets
    pub const fn union(self, other: Self) -> Self {
        Self {
            old: self.old || other.old,
            new: self.new || other.new,
            prior: self.prior || other.prior,
            initial: self.initial || other.initial,
        }
    }
}

impl std::ops::BitOr for ObservationOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}
