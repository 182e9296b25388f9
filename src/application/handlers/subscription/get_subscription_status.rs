//! GetSubscriptionStatusHandler - Query returning the record and its entitlements.
//!
//! Reconciles due expiries before evaluating, so a trial that ended while the
//! user was away is reverted on their next read.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::domain::subscription::{
    evaluate, AdminAllowlist, Entitlements, Subscription, SubscriptionError,
};
use crate::ports::{EventPublisher, SubscriptionRepository};

use super::support::{load_or_create, reconcile};

#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub user: AuthenticatedUser,
    pub now: Timestamp,
}

#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusResult {
    pub subscription: Subscription,
    pub entitlements: Entitlements,
}

pub struct GetSubscriptionStatusHandler {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    admins: Arc<AdminAllowlist>,
}

impl GetSubscriptionStatusHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        admins: Arc<AdminAllowlist>,
    ) -> Self {
        Self {
            repository,
            event_publisher,
            admins,
        }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<GetSubscriptionStatusResult, SubscriptionError> {
        let repository = self.repository.as_ref();
        let publisher = self.event_publisher.as_ref();

        let mut subscription = load_or_create(repository, publisher, &query.user.id, query.now).await?;
        reconcile(repository, publisher, &mut subscription, query.now).await?;

        let is_admin = self.admins.is_admin(&query.user);
        let entitlements = evaluate(Some(&subscription), is_admin, query.now);

        Ok(GetSubscriptionStatusResult {
            subscription,
            entitlements,
        })
    }
}
