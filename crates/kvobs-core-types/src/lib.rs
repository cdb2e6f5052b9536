//! Core types shared across kvobs facilities
//!
//! This crate provides foundational types used by the observation core and
//! its logging facility:
//!
//! - **Tokens**: ObservationId, SubscriptionToken
//! - **Schema constants**: Canonical field keys and event names

pub mod schema;
pub mod tokens;

pub use tokens::{ObservationId, SubscriptionToken};
