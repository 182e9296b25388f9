//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers write; query handlers read (and may apply due expiry).

pub mod handlers;
