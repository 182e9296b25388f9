//! CheckUsageLimitHandler - Query for one resource's usage against its ceiling.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::domain::subscription::{
    evaluate, AdminAllowlist, LimitedResource, SubscriptionError, UsageLimit,
};
use crate::ports::{EventPublisher, SubscriptionRepository};

use super::support::reconcile;

#[derive(Debug, Clone)]
pub struct CheckUsageLimitQuery {
    pub user: AuthenticatedUser,
    /// Wire name, e.g. "dailyTasks". Unknown names are not an error.
    pub resource: String,
    pub now: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckUsageLimitResult {
    pub resource: String,
    pub limit: UsageLimit,
    pub is_premium: bool,
}

pub struct CheckUsageLimitHandler {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    admins: Arc<AdminAllowlist>,
}

impl CheckUsageLimitHandler {
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
        query: CheckUsageLimitQuery,
    ) -> Result<CheckUsageLimitResult, SubscriptionError> {
        let mut subscription = self.repository.find_by_user_id(&query.user.id).await?;
        if let Some(sub) = subscription.as_mut() {
            reconcile(
                self.repository.as_ref(),
                self.event_publisher.as_ref(),
                sub,
                query.now,
            )
            .await?;
        }

        let entitlements = evaluate(
            subscription.as_ref(),
            self.admins.is_admin(&query.user),
            query.now,
        );

        if LimitedResource::lookup(&query.resource).is_none() {
            tracing::debug!(resource = %query.resource, "unknown resource treated as unlimited");
        }

        Ok(CheckUsageLimitResult {
            limit: entitlements.check_usage_limit(&query.resource),
            is_premium: entitlements.is_premium,
            resource: query.resource,
        })
    }
}
