//! In-memory repository adapters.

mod subscription_repository;

pub use subscription_repository::InMemorySubscriptionRepository;
