//! In-memory event bus.
//!
//! Keeps the most recent events in process and logs each one. Used by the
//! binary when no external broker is configured, and by tests for
//! assertions on what was published.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// Retention used by `InMemoryEventBus::new`.
pub const DEFAULT_RETENTION: usize = 1_000;

/// In-memory event bus with bounded retention.
///
/// Once `retention` events are held, the oldest is dropped for each new one.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.publish(envelope).await?;
///
/// assert_eq!(bus.event_count(), 1);
/// assert!(bus.has_event("subscription.trial_started.v1"));
/// ```
pub struct InMemoryEventBus {
    published: RwLock<VecDeque<EventEnvelope>>,
    retention: usize,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            published: RwLock::new(VecDeque::new()),
            retention: retention.max(1),
        }
    }

    // === Inspection ===

    /// Returns retained events, oldest first. Empty if the lock is poisoned.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.published.read().map(|events| events.len()).unwrap_or(0)
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .map(|events| events.iter().any(|e| e.event_type == event_type))
            .unwrap_or(false)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            "event published"
        );

        let mut events = self.published.write().map_err(|_| {
            DomainError::new(ErrorCode::InternalError, "Event bus lock poisoned")
        })?;
        if events.len() >= self.retention {
            events.pop_front();
        }
        events.push_back(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{EventId, EventMetadata, Timestamp};
    use serde_json::json;

    fn envelope(event_type: &str, aggregate_id: &str) -> EventEnvelope {
        EventEnvelope {
            event_id: EventId::new(),
            event_type: event_type.to_string(),
            schema_version: 1,
            aggregate_id: aggregate_id.to_string(),
            aggregate_type: "Subscription".to_string(),
            occurred_at: Timestamp::now(),
            payload: json!({}),
            metadata: EventMetadata::default(),
        }
    }

    #[tokio::test]
    async fn publish_captures_event() {
        let bus = InMemoryEventBus::new();

        bus.publish(envelope("subscription.created.v1", "sub-1"))
            .await
            .unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("subscription.created.v1"));
        assert!(!bus.has_event("subscription.cancelled.v1"));
    }

    #[tokio::test]
    async fn filters_by_type_in_publish_order() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("subscription.created.v1", "sub-1")).await.unwrap();
        bus.publish(envelope("subscription.trial_started.v1", "sub-1")).await.unwrap();
        bus.publish(envelope("subscription.created.v1", "sub-2")).await.unwrap();

        let created: Vec<_> = bus
            .events_of_type("subscription.created.v1")
            .into_iter()
            .map(|e| e.aggregate_id)
            .collect();
        assert_eq!(created, vec!["sub-1", "sub-2"]);
    }

    #[tokio::test]
    async fn retention_drops_oldest() {
        let bus = InMemoryEventBus::with_retention(2);
        for event_type in ["one", "two", "three"] {
            bus.publish(envelope(event_type, "a")).await.unwrap();
        }

        let types: Vec<_> = bus.published_events().into_iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec!["two", "three"]);
    }
}
