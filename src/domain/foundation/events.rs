//! Domain event plumbing.
//!
//! Events are plain serializable structs. `domain_event!` gives them the
//! routing fields, and `to_envelope()` turns them into the `EventEnvelope`
//! handed to an `EventPublisher`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::{DomainError, ErrorCode, Timestamp};

/// Routing fields shared by every domain event.
pub trait DomainEvent: Send + Sync {
    /// Dotted name ending in the schema version, e.g. "subscription.trial_started.v1".
    fn event_type(&self) -> &'static str;

    /// Must agree with the `.vN` suffix of `event_type`.
    fn schema_version(&self) -> u32;

    fn aggregate_id(&self) -> String;

    fn aggregate_type(&self) -> &'static str;

    fn occurred_at(&self) -> Timestamp;

    fn event_id(&self) -> EventId;
}

/// Blanket envelope construction for any serializable event.
pub trait SerializableDomainEvent: DomainEvent + Serialize {
    fn to_envelope(&self) -> Result<EventEnvelope, DomainError> {
        let payload = serde_json::to_value(self).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("cannot encode {} payload: {}", self.event_type(), e),
            )
        })?;

        Ok(EventEnvelope {
            event_id: self.event_id(),
            event_type: self.event_type().to_string(),
            schema_version: self.schema_version(),
            aggregate_id: self.aggregate_id(),
            aggregate_type: self.aggregate_type().to_string(),
            occurred_at: self.occurred_at(),
            payload,
            metadata: EventMetadata::default(),
        })
    }
}

impl<T: DomainEvent + Serialize> SerializableDomainEvent for T {}

/// Implements `DomainEvent` by naming the struct fields that hold each
/// routing value.
///
/// ```ignore
/// domain_event!(
///     TrialStarted,
///     event_type = "subscription.trial_started.v1",
///     schema_version = 1,
///     aggregate_id = subscription_id,
///     aggregate_type = "Subscription",
///     occurred_at = started_at,
///     event_id = event_id
/// );
/// ```
#[macro_export]
macro_rules! domain_event {
    (
        $event:ident,
        event_type = $event_type:expr,
        schema_version = $version:expr,
        aggregate_id = $aggregate_id:ident,
        aggregate_type = $aggregate_type:expr,
        occurred_at = $occurred_at:ident,
        event_id = $event_id:ident
    ) => {
        impl $crate::domain::foundation::DomainEvent for $event {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn schema_version(&self) -> u32 {
                $version
            }

            fn aggregate_id(&self) -> String {
                self.$aggregate_id.to_string()
            }

            fn aggregate_type(&self) -> &'static str {
                $aggregate_type
            }

            fn occurred_at(&self) -> $crate::domain::foundation::Timestamp {
                self.$occurred_at
            }

            fn event_id(&self) -> $crate::domain::foundation::EventId {
                self.$event_id.clone()
            }
        }
    };
}

pub use crate::domain_event;

/// Random event identifier, used by consumers to drop duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Account whose request produced the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// What actually travels through an `EventPublisher`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub event_type: String,
    pub schema_version: u32,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub occurred_at: Timestamp,
    pub payload: JsonValue,
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.metadata.user_id = Some(user_id.into());
        self
    }
}
