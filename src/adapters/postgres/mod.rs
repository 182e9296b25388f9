//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSubscriptionRepository` - Subscription persistence

mod subscription_repository;

pub use subscription_repository::PostgresSubscriptionRepository;
