//! Unique tokens for keying observation bookkeeping
//!
//! Both token types are opaque. Their only contract is uniqueness within a
//! process; the textual form is meant for logs, not for parsing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a single observation (one per created observer handle)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObservationId(String);

impl ObservationId {
    /// Generate a new ObservationId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of one per-segment subscription record inside an observed object
///
/// Handed out by an observed object when an observer is added, and handed
/// back to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionToken(Uuid);

impl SubscriptionToken {
    /// Generate a new time-ordered SubscriptionToken using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
