//! EventPublisher port - Interface for publishing domain events.
//!
//! The domain publishes events without knowing the transport. Handlers
//! publish after the write has been persisted.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// A failed publish is returned to the handler, which reports it to the
/// caller even though the state change has already been stored.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;
}
