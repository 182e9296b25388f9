//! HTTP adapters - REST API for LifeBuddy entitlements.

pub mod middleware;
pub mod router;
pub mod subscription;

pub use router::api_router;
pub use subscription::{subscription_routes, SubscriptionAppState};
