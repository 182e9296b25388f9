//! ExpireTrialsHandler - Reconciliation sweep for time-driven expiry.
//!
//! Invoked by an external scheduler. The listings only nominate users; each
//! record is re-read and re-checked with the shared expiry predicate before
//! it is touched, so a plan bought after the listing is never overwritten
//! and running the sweep twice for the same `now` expires nothing new.

use std::sync::Arc;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{SubscriptionError, SubscriptionStatus};
use crate::ports::{EventPublisher, SubscriptionRepository};

use super::support::reconcile;

#[derive(Debug, Clone)]
pub struct ExpireTrialsCommand {
    pub now: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpireTrialsResult {
    pub trials_expired: usize,
    pub subscriptions_expired: usize,
    /// Records that could not be updated. They are retried on the next sweep.
    pub failed: usize,
}

pub struct ExpireTrialsHandler {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ExpireTrialsHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: ExpireTrialsCommand) -> Result<ExpireTrialsResult, SubscriptionError> {
        let repository = self.repository.as_ref();
        let publisher = self.event_publisher.as_ref();

        let mut due: Vec<UserId> = repository
            .find_trials_ending_before(cmd.now)
            .await?
            .into_iter()
            .chain(repository.find_paid_periods_ending_before(cmd.now).await?)
            .map(|subscription| subscription.user_id)
            .collect();
        due.sort();
        due.dedup();

        let mut result = ExpireTrialsResult::default();
        for user_id in due {
            match self.expire_one(&user_id, cmd.now).await {
                Ok(Some(true)) => result.trials_expired += 1,
                Ok(Some(false)) => result.subscriptions_expired += 1,
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(
                        user_id = %user_id,
                        error = %err,
                        "failed to expire subscription"
                    );
                    result.failed += 1;
                }
            }
        }

        if result != ExpireTrialsResult::default() {
            tracing::info!(
                trials_expired = result.trials_expired,
                subscriptions_expired = result.subscriptions_expired,
                failed = result.failed,
                "expiry sweep finished"
            );
        }
        Ok(result)
    }

    /// Reconciles the freshest copy of one record. `Some(true)` for an
    /// expired trial, `Some(false)` for an expired paid plan, `None` when
    /// nothing was due any more.
    async fn expire_one(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<bool>, SubscriptionError> {
        let repository = self.repository.as_ref();
        let Some(mut subscription) = repository.find_by_user_id(user_id).await? else {
            return Ok(None);
        };

        let was_trial = subscription.status == SubscriptionStatus::Trial;
        let changed =
            reconcile(repository, self.event_publisher.as_ref(), &mut subscription, now).await?;
        Ok(changed.then_some(was_trial))
    }
}
