//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Session validation (JWT, mock)
//! - `events` - In-memory event bus
//! - `http` - REST API and premium gates
//! - `memory` - In-memory subscription store
//! - `postgres` - PostgreSQL subscription store

pub mod auth;
pub mod events;
pub mod http;
pub mod memory;
pub mod postgres;

pub use events::InMemoryEventBus;
