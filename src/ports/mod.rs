//! Ports - Interfaces between the domain and the outside world.
//!
//! - `SubscriptionRepository` - Subscription persistence
//! - `EventPublisher` - Domain event publishing
//! - `SessionValidator` - Bearer token validation

mod event_publisher;
mod session_validator;
mod subscription_repository;

pub use event_publisher::EventPublisher;
pub use session_validator::SessionValidator;
pub use subscription_repository::SubscriptionRepository;
