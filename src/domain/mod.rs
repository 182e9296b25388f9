//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, events)
//! - `subscription` - Subscription record, entitlement evaluation, trial gate, route guard

pub mod foundation;
pub mod subscription;
