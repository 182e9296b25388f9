//! RecordUsageHandler - Counts one unit of a free-tier resource.
//!
//! Premium callers are never counted. Free callers at their ceiling get
//! `LimitReached` and nothing is written.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, EventId, Timestamp};
use crate::domain::subscription::{
    evaluate, AdminAllowlist, Limit, LimitedResource, Subscription, SubscriptionError,
    UsageLimit, UsageRecorded,
};
use crate::ports::{EventPublisher, SubscriptionRepository};

use super::support::{load_or_create, publish, reconcile};

#[derive(Debug, Clone)]
pub struct RecordUsageCommand {
    pub user: AuthenticatedUser,
    pub resource: String,
    pub now: Timestamp,
}

#[derive(Debug, Clone)]
pub struct RecordUsageResult {
    pub subscription: Subscription,
    pub resource: LimitedResource,
    pub limit: UsageLimit,
    /// False when the caller is premium and usage is not tracked.
    pub recorded: bool,
}

pub struct RecordUsageHandler {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    admins: Arc<AdminAllowlist>,
}

impl RecordUsageHandler {
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

    pub async fn handle(&self, cmd: RecordUsageCommand) -> Result<RecordUsageResult, SubscriptionError> {
        let resource = LimitedResource::lookup(&cmd.resource)
            .ok_or_else(|| SubscriptionError::unknown_resource(cmd.resource.clone()))?;

        let repository = self.repository.as_ref();
        let publisher = self.event_publisher.as_ref();
        let user_id = &cmd.user.id;

        let mut subscription = load_or_create(repository, publisher, user_id, cmd.now).await?;
        reconcile(repository, publisher, &mut subscription, cmd.now).await?;

        let entitlements = evaluate(Some(&subscription), self.admins.is_admin(&cmd.user), cmd.now);
        let limit = entitlements.limit_for(resource);

        if entitlements.is_premium {
            return Ok(RecordUsageResult {
                subscription,
                resource,
                limit,
                recorded: false,
            });
        }

        if limit.reached {
            tracing::info!(user_id = %user_id, resource = %resource, current = limit.current, "usage limit reached");
            return Err(SubscriptionError::limit_reached(
                resource,
                limit.current,
                resource.free_limit(),
            ));
        }

        let current = subscription.record_usage(resource, cmd.now);
        repository.update(&subscription).await?;

        let event = UsageRecorded {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: user_id.clone(),
            resource,
            current,
            recorded_at: cmd.now,
        };
        publish(publisher, &event, user_id).await?;

        Ok(RecordUsageResult {
            subscription,
            resource,
            limit: UsageLimit::new(current, Limit::Bounded(resource.free_limit())),
            recorded: true,
        })
    }
}
