//! Subscription domain events.
//!
//! Published by the application handlers after each successful write:
//! - `SubscriptionCreated` - Free record created at registration
//! - `TrialTaskCompleted` - Prerequisite progress changed
//! - `TrialStarted` - Trial granted
//! - `TrialExpired` - Trial ran out and access reverted to free
//! - `SubscriptionActivated` - Paid plan started
//! - `SubscriptionCancelled` - Paid plan cancelled, access until period end
//! - `SubscriptionExpired` - Paid period lapsed
//! - `UsageRecorded` - A free-tier counter moved

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{domain_event, EventId, SubscriptionId, Timestamp, UserId};

use super::{LimitedResource, Plan, TrialTasks};

// ════════════════════════════════════════════════════════════════════════════
// SubscriptionCreated
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionCreated {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub created_at: Timestamp,
}

domain_event!(
    SubscriptionCreated,
    event_type = "subscription.created.v1",
    schema_version = 1,
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = created_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// TrialTaskCompleted
// ════════════════════════════════════════════════════════════════════════════

/// Published when a trial task changed progress. Repeats of an already
/// completed flag task publish nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialTaskCompleted {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,

    /// Task name, e.g. "watch-ad".
    pub task: String,

    /// Progress after the task was applied.
    pub progress: TrialTasks,

    pub completed_at: Timestamp,
}

domain_event!(
    TrialTaskCompleted,
    event_type = "subscription.trial_task_completed.v1",
    schema_version = 1,
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = completed_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// TrialStarted
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialStarted {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub trial_end_date: Timestamp,
    pub started_at: Timestamp,
}

domain_event!(
    TrialStarted,
    event_type = "subscription.trial_started.v1",
    schema_version = 1,
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = started_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// TrialExpired
// ════════════════════════════════════════════════════════════════════════════

/// Published exactly once per trial, by whichever path observed expiry first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialExpired {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub expired_at: Timestamp,
}

domain_event!(
    TrialExpired,
    event_type = "subscription.trial_expired.v1",
    schema_version = 1,
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = expired_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SubscriptionActivated
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionActivated {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub plan: Plan,
    pub period_end: Timestamp,

    /// True when this activation granted the premium badge.
    pub badge_granted: bool,

    pub activated_at: Timestamp,
}

domain_event!(
    SubscriptionActivated,
    event_type = "subscription.activated.v1",
    schema_version = 1,
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = activated_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SubscriptionCancelled
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionCancelled {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub plan: Plan,

    /// Premium access ends here.
    pub effective_at: Timestamp,

    pub cancelled_at: Timestamp,
}

domain_event!(
    SubscriptionCancelled,
    event_type = "subscription.cancelled.v1",
    schema_version = 1,
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = cancelled_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SubscriptionExpired
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionExpired {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,

    /// Paid plan that lapsed.
    pub previous_plan: Plan,

    pub expired_at: Timestamp,
}

domain_event!(
    SubscriptionExpired,
    event_type = "subscription.expired.v1",
    schema_version = 1,
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = expired_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// UsageRecorded
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecorded {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub resource: LimitedResource,
    pub current: u32,
    pub recorded_at: Timestamp,
}

domain_event!(
    UsageRecorded,
    event_type = "subscription.usage_recorded.v1",
    schema_version = 1,
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = recorded_at,
    event_id = event_id
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainEvent, SerializableDomainEvent};

    #[test]
    fn trial_started_envelope_carries_routing_fields() {
        let subscription_id = SubscriptionId::new();
        let event = TrialStarted {
            event_id: EventId::new(),
            subscription_id,
            user_id: UserId::new("user-1").unwrap(),
            trial_end_date: Timestamp::now().add_days(7),
            started_at: Timestamp::now(),
        };

        let envelope = event.to_envelope().unwrap();

        assert_eq!(envelope.event_type, "subscription.trial_started.v1");
        assert_eq!(envelope.schema_version, 1);
        assert_eq!(envelope.aggregate_type, "Subscription");
        assert_eq!(envelope.aggregate_id, subscription_id.to_string());
        assert_eq!(envelope.payload["user_id"], "user-1");
    }

    #[test]
    fn event_type_suffix_matches_schema_version() {
        let event = SubscriptionExpired {
            event_id: EventId::new(),
            subscription_id: SubscriptionId::new(),
            user_id: UserId::new("user-2").unwrap(),
            previous_plan: Plan::Yearly,
            expired_at: Timestamp::now(),
        };
        assert!(event
            .event_type()
            .ends_with(&format!(".v{}", event.schema_version())));
    }

    #[test]
    fn task_progress_is_in_payload() {
        let event = TrialTaskCompleted {
            event_id: EventId::new(),
            subscription_id: SubscriptionId::new(),
            user_id: UserId::new("user-3").unwrap(),
            task: "share".to_string(),
            progress: TrialTasks {
                watched_ad: true,
                followed_instagram: false,
                shares: 3,
            },
            completed_at: Timestamp::now(),
        };

        let envelope = event.to_envelope().unwrap();
        assert_eq!(envelope.payload["progress"]["shares"], 3);
        assert_eq!(envelope.payload["progress"]["watchedAd"], true);
    }
}
