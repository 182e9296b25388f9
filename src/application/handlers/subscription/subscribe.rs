//! SubscribeHandler - Moves a user onto a paid plan.
//!
//! Payment capture happens upstream; this records the plan change once the
//! payment provider has confirmed it.

use std::sync::Arc;

use crate::domain::foundation::{EventId, Timestamp, UserId};
use crate::domain::subscription::{Plan, Subscription, SubscriptionActivated, SubscriptionError};
use crate::ports::{EventPublisher, SubscriptionRepository};

use super::support::{load_or_create, publish, reconcile};

#[derive(Debug, Clone)]
pub struct SubscribeCommand {
    pub user_id: UserId,
    pub plan: Plan,
    pub now: Timestamp,
}

#[derive(Debug, Clone)]
pub struct SubscribeResult {
    pub subscription: Subscription,
    pub period_end: Timestamp,
    pub badge_granted: bool,
}

pub struct SubscribeHandler {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl SubscribeHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: SubscribeCommand) -> Result<SubscribeResult, SubscriptionError> {
        let repository = self.repository.as_ref();
        let publisher = self.event_publisher.as_ref();

        let mut subscription = load_or_create(repository, publisher, &cmd.user_id, cmd.now).await?;
        reconcile(repository, publisher, &mut subscription, cmd.now).await?;

        let had_badge = subscription.premium_badge;
        let period_end = subscription.subscribe(cmd.plan, cmd.now)?;
        let badge_granted = !had_badge && subscription.premium_badge;

        repository.update(&subscription).await?;

        tracing::info!(user_id = %cmd.user_id, plan = %cmd.plan, "subscription activated");

        let event = SubscriptionActivated {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: cmd.user_id.clone(),
            plan: cmd.plan,
            period_end,
            badge_granted,
            activated_at: cmd.now,
        };
        publish(publisher, &event, &cmd.user_id).await?;

        Ok(SubscribeResult {
            subscription,
            period_end,
            badge_granted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::subscription::support::mocks::*;
    use crate::domain::subscription::SubscriptionStatus;

    fn command(plan: Plan, now: Timestamp) -> SubscribeCommand {
        SubscribeCommand {
            user_id: user_id(),
            plan,
            now,
        }
    }

    #[tokio::test]
    async fn free_user_upgrades_to_yearly() {
        let repo = Arc::new(MockSubscriptionRepository::with_subscription(free_subscription()));
        let publisher = Arc::new(MockEventPublisher::new());
        let handler = SubscribeHandler::new(repo.clone(), publisher.clone());

        let result = handler.handle(command(Plan::Yearly, t0())).await.unwrap();

        assert_eq!(result.period_end, t0().add_years(1));
        assert!(result.badge_granted);
        let stored = repo.get(&user_id()).unwrap();
        assert_eq!(stored.plan, Plan::Yearly);
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert_eq!(publisher.event_types(), vec!["subscription.activated.v1"]);
        assert_eq!(publisher.published()[0].payload["badge_granted"], true);
    }

    #[tokio::test]
    async fn trial_user_can_upgrade_mid_trial() {
        let repo = Arc::new(MockSubscriptionRepository::with_subscription(trial_subscription()));
        let handler = SubscribeHandler::new(repo.clone(), Arc::new(MockEventPublisher::new()));

        handler
            .handle(command(Plan::Monthly, t0().add_days(2)))
            .await
            .unwrap();

        let stored = repo.get(&user_id()).unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert!(stored.trial_end_date.is_none());
    }

    #[tokio::test]
    async fn free_plan_is_invalid() {
        let repo = Arc::new(MockSubscriptionRepository::with_subscription(free_subscription()));
        let handler = SubscribeHandler::new(repo, Arc::new(MockEventPublisher::new()));

        let err = handler.handle(command(Plan::Free, t0())).await.unwrap_err();

        assert_eq!(err, SubscriptionError::invalid_plan("free"));
    }

    #[tokio::test]
    async fn badge_is_not_granted_twice() {
        let repo = Arc::new(MockSubscriptionRepository::with_subscription(free_subscription()));
        let handler = SubscribeHandler::new(repo, Arc::new(MockEventPublisher::new()));

        handler.handle(command(Plan::Monthly, t0())).await.unwrap();
        let second = handler
            .handle(command(Plan::Yearly, t0().add_days(1)))
            .await
            .unwrap();

        assert!(!second.badge_granted);
    }
}
