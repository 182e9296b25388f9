//! HTTP adapter for subscription endpoints.
//!
//! Exposes trial gating, paid plans and usage limits under
//! `/api/subscriptions`. See `routes` for the full table.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::ErrorResponse;
pub use handlers::{SubscriptionApiError, SubscriptionAppState};
pub use routes::subscription_routes;
