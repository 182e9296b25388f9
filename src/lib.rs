//! LifeBuddy premium entitlements.
//!
//! Decides what each LifeBuddy user may do: free-tier features and usage
//! ceilings, the task-gated free trial, paid plans, admin override, and the
//! route guards that enforce all of it over HTTP.
//!
//! Layout follows ports and adapters: `domain` holds pure rules, `ports`
//! the storage/auth/event seams, `application` the command and query
//! handlers, and `adapters` the axum, PostgreSQL and in-memory
//! implementations.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
