//! CancelSubscriptionHandler - Cancels a paid plan at period end.

use std::sync::Arc;

use crate::domain::foundation::{EventId, Timestamp, UserId};
use crate::domain::subscription::{Subscription, SubscriptionCancelled, SubscriptionError};
use crate::ports::{EventPublisher, SubscriptionRepository};

use super::support::{publish, reconcile};

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
    pub now: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub subscription: Subscription,
    /// When premium access ends.
    pub effective_at: Timestamp,
}

/// Users keep premium access until the end of the current billing period.
pub struct CancelSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, SubscriptionError> {
        let repository = self.repository.as_ref();
        let publisher = self.event_publisher.as_ref();

        let mut subscription = repository
            .find_by_user_id(&cmd.user_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found_for_user(cmd.user_id.clone()))?;
        reconcile(repository, publisher, &mut subscription, cmd.now).await?;

        let plan = subscription.plan;
        let effective_at = subscription.cancel(cmd.now)?;
        repository.update(&subscription).await?;

        tracing::info!(user_id = %cmd.user_id, effective_at = %effective_at, "subscription cancelled");

        let event = SubscriptionCancelled {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: cmd.user_id.clone(),
            plan,
            effective_at,
            cancelled_at: cmd.now,
        };
        publish(publisher, &event, &cmd.user_id).await?;

        Ok(CancelSubscriptionResult {
            subscription,
            effective_at,
        })
    }
}
