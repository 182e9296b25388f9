//! StartTrialHandler - Grants the premium trial once every task is done.

use std::sync::Arc;

use crate::domain::foundation::{EventId, Timestamp, UserId};
use crate::domain::subscription::{Subscription, SubscriptionError, TrialPolicy, TrialStarted};
use crate::ports::{EventPublisher, SubscriptionRepository};

use super::support::{load_or_create, publish, reconcile};

#[derive(Debug, Clone)]
pub struct StartTrialCommand {
    pub user_id: UserId,
    pub now: Timestamp,
}

#[derive(Debug, Clone)]
pub struct StartTrialResult {
    pub subscription: Subscription,
    pub trial_end_date: Timestamp,
}

pub struct StartTrialHandler {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    policy: TrialPolicy,
}

impl StartTrialHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        policy: TrialPolicy,
    ) -> Self {
        Self {
            repository,
            event_publisher,
            policy,
        }
    }

    pub async fn handle(&self, cmd: StartTrialCommand) -> Result<StartTrialResult, SubscriptionError> {
        let repository = self.repository.as_ref();
        let publisher = self.event_publisher.as_ref();

        // 1. Freshest record, with any due expiry applied first
        let mut subscription = load_or_create(repository, publisher, &cmd.user_id, cmd.now).await?;
        reconcile(repository, publisher, &mut subscription, cmd.now).await?;

        // 2. Domain rules
        let trial_end_date = subscription.start_trial(cmd.now, &self.policy)?;

        // 3. Persist and publish
        repository.update(&subscription).await?;

        tracing::info!(user_id = %cmd.user_id, trial_end = %trial_end_date, "trial started");

        let event = TrialStarted {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: cmd.user_id.clone(),
            trial_end_date,
            started_at: cmd.now,
        };
        publish(publisher, &event, &cmd.user_id).await?;

        Ok(StartTrialResult {
            subscription,
            trial_end_date,
        })
    }
}
