//! CreateSubscriptionHandler - Registration hook creating the free record.

use std::sync::Arc;

use crate::domain::foundation::{EventId, Timestamp, UserId};
use crate::domain::subscription::{Subscription, SubscriptionCreated, SubscriptionError};
use crate::ports::{EventPublisher, SubscriptionRepository};

use super::support::publish;

#[derive(Debug, Clone)]
pub struct CreateSubscriptionCommand {
    pub user_id: UserId,
    pub now: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateSubscriptionResult {
    pub subscription: Subscription,
}

/// Creates the free/active subscription every new account starts with.
pub struct CreateSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CreateSubscriptionHandler {
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
        cmd: CreateSubscriptionCommand,
    ) -> Result<CreateSubscriptionResult, SubscriptionError> {
        if self.repository.find_by_user_id(&cmd.user_id).await?.is_some() {
            return Err(SubscriptionError::already_exists(cmd.user_id));
        }

        let subscription = Subscription::new_free(cmd.user_id.clone(), cmd.now);
        self.repository.save(&subscription).await?;

        let event = SubscriptionCreated {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: cmd.user_id.clone(),
            created_at: cmd.now,
        };
        publish(self.event_publisher.as_ref(), &event, &cmd.user_id).await?;

        Ok(CreateSubscriptionResult { subscription })
    }
}
