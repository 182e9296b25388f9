//! Steps shared by several subscription handlers.

use crate::domain::foundation::{ErrorCode, EventId, SerializableDomainEvent, Timestamp, UserId};
use crate::domain::subscription::{
    Subscription, SubscriptionCreated, SubscriptionError, SubscriptionExpired, TrialExpired,
};
use crate::ports::{EventPublisher, SubscriptionRepository};

/// Wraps an event and publishes it with the acting user attached.
pub(crate) async fn publish<E: SerializableDomainEvent>(
    publisher: &dyn EventPublisher,
    event: &E,
    user_id: &UserId,
) -> Result<(), SubscriptionError> {
    let envelope = event.to_envelope()?.with_user_id(user_id.as_str());
    publisher.publish(envelope).await?;
    Ok(())
}

/// Loads the user's record, creating the free default if none exists yet.
///
/// A concurrent creation wins over ours; the stored record is re-read.
pub(crate) async fn load_or_create(
    repository: &dyn SubscriptionRepository,
    publisher: &dyn EventPublisher,
    user_id: &UserId,
    now: Timestamp,
) -> Result<Subscription, SubscriptionError> {
    if let Some(existing) = repository.find_by_user_id(user_id).await? {
        return Ok(existing);
    }

    let subscription = Subscription::new_free(user_id.clone(), now);
    match repository.save(&subscription).await {
        Ok(()) => {
            let event = SubscriptionCreated {
                event_id: EventId::new(),
                subscription_id: subscription.id,
                user_id: user_id.clone(),
                created_at: now,
            };
            publish(publisher, &event, user_id).await?;
            Ok(subscription)
        }
        Err(err) if err.code == ErrorCode::SubscriptionExists => repository
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found_for_user(user_id.clone())),
        Err(err) => Err(err.into()),
    }
}

/// Applies due trial and paid-period expiry, persisting and publishing only
/// when something changed. Returns true if the record was updated.
pub(crate) async fn reconcile(
    repository: &dyn SubscriptionRepository,
    publisher: &dyn EventPublisher,
    subscription: &mut Subscription,
    now: Timestamp,
) -> Result<bool, SubscriptionError> {
    let previous_plan = subscription.plan;
    let trial_expired = subscription.expire_trial_if_due(now);
    let paid_expired = subscription.expire_paid_if_due(now);
    if !trial_expired && !paid_expired {
        return Ok(false);
    }

    repository.update(subscription).await?;

    let user_id = subscription.user_id.clone();
    if trial_expired {
        tracing::info!(user_id = %user_id, "trial expired");
        let event = TrialExpired {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: user_id.clone(),
            expired_at: now,
        };
        publish(publisher, &event, &user_id).await?;
    }
    if paid_expired {
        tracing::info!(user_id = %user_id, plan = %previous_plan, "paid period lapsed");
        let event = SubscriptionExpired {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: user_id.clone(),
            previous_plan,
            expired_at: now,
        };
        publish(publisher, &event, &user_id).await?;
    }
    Ok(true)
}

#[cfg(test)]
pub(crate) mod mocks {
    //! Mutex-backed port doubles shared by the handler tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::domain::foundation::{
        DomainError, ErrorCode, EventEnvelope, Timestamp, UserId,
    };
    use crate::domain::subscription::{Subscription, SubscriptionStatus, TrialTask};
    use crate::ports::{EventPublisher, SubscriptionRepository};

    pub struct MockSubscriptionRepository {
        subscriptions: Mutex<HashMap<UserId, Subscription>>,
        fail_update: bool,
        /// When set, the expiry listings return this instead of the store.
        listing: Option<Vec<Subscription>>,
    }

    impl MockSubscriptionRepository {
        pub fn new() -> Self {
            Self {
                subscriptions: Mutex::new(HashMap::new()),
                fail_update: false,
                listing: None,
            }
        }

        pub fn with_subscription(subscription: Subscription) -> Self {
            let repo = Self::new();
            repo.subscriptions
                .lock()
                .unwrap()
                .insert(subscription.user_id.clone(), subscription);
            repo
        }

        pub fn failing_update(subscription: Subscription) -> Self {
            let mut repo = Self::with_subscription(subscription);
            repo.fail_update = true;
            repo
        }

        /// Stores `stored` but lists `listed` as due, as if the record
        /// changed between the listing and the write.
        pub fn with_stale_listing(stored: Subscription, listed: Subscription) -> Self {
            let mut repo = Self::with_subscription(stored);
            repo.listing = Some(vec![listed]);
            repo
        }

        pub fn get(&self, user_id: &UserId) -> Option<Subscription> {
            self.subscriptions.lock().unwrap().get(user_id).cloned()
        }

        pub fn count(&self) -> usize {
            self.subscriptions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SubscriptionRepository for MockSubscriptionRepository {
        async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
            let mut subs = self.subscriptions.lock().unwrap();
            if subs.contains_key(&subscription.user_id) {
                return Err(DomainError::new(
                    ErrorCode::SubscriptionExists,
                    "User already has a subscription",
                ));
            }
            subs.insert(subscription.user_id.clone(), subscription.clone());
            Ok(())
        }

        async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
            if self.fail_update {
                return Err(DomainError::database("Simulated update failure"));
            }
            let mut subs = self.subscriptions.lock().unwrap();
            match subs.get_mut(&subscription.user_id) {
                Some(stored) => {
                    let tasks = stored.trial_tasks;
                    *stored = subscription.clone();
                    stored.trial_tasks = tasks;
                    Ok(())
                }
                None => Err(DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    "Subscription not found",
                )),
            }
        }

        async fn find_by_user_id(
            &self,
            user_id: &UserId,
        ) -> Result<Option<Subscription>, DomainError> {
            Ok(self.get(user_id))
        }

        async fn apply_trial_task(
            &self,
            user_id: &UserId,
            task: TrialTask,
            now: Timestamp,
        ) -> Result<Subscription, DomainError> {
            let mut subs = self.subscriptions.lock().unwrap();
            let stored = subs.get_mut(user_id).ok_or_else(|| {
                DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
            })?;
            stored.complete_trial_task(task, now);
            Ok(stored.clone())
        }

        async fn find_trials_ending_before(
            &self,
            cutoff: Timestamp,
        ) -> Result<Vec<Subscription>, DomainError> {
            if let Some(listing) = &self.listing {
                return Ok(listing.clone());
            }
            Ok(self
                .subscriptions
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.status == SubscriptionStatus::Trial)
                .filter(|s| s.trial_end_date.map_or(false, |end| end <= cutoff))
                .cloned()
                .collect())
        }

        async fn find_paid_periods_ending_before(
            &self,
            cutoff: Timestamp,
        ) -> Result<Vec<Subscription>, DomainError> {
            if self.listing.is_some() {
                return Ok(Vec::new());
            }
            Ok(self
                .subscriptions
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.paid_period_lapsed(cutoff))
                .cloned()
                .collect())
        }
    }

    pub struct MockEventPublisher {
        published: Mutex<Vec<EventEnvelope>>,
        fail_publish: bool,
    }

    impl MockEventPublisher {
        pub fn new() -> Self {
            Self {
                published: Mutex::new(Vec::new()),
                fail_publish: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                published: Mutex::new(Vec::new()),
                fail_publish: true,
            }
        }

        pub fn event_types(&self) -> Vec<String> {
            self.published
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.event_type.clone())
                .collect()
        }

        pub fn published(&self) -> Vec<EventEnvelope> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventPublisher for MockEventPublisher {
        async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
            if self.fail_publish {
                return Err(DomainError::new(
                    ErrorCode::InternalError,
                    "Simulated publish failure",
                ));
            }
            self.published.lock().unwrap().push(event);
            Ok(())
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Fixtures
    // ────────────────────────────────────────────────────────────────────────

    pub fn user_id() -> UserId {
        UserId::new("test-user-123").unwrap()
    }

    pub fn t0() -> Timestamp {
        use chrono::{TimeZone, Utc};
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2025, 2, 3, 10, 0, 0).unwrap())
    }

    pub fn free_subscription() -> Subscription {
        Subscription::new_free(user_id(), t0())
    }

    pub fn tasks_done_subscription() -> Subscription {
        let mut sub = free_subscription();
        sub.complete_trial_task(TrialTask::WatchAd, t0());
        sub.complete_trial_task(TrialTask::FollowInstagram, t0());
        sub.complete_trial_task(TrialTask::Share { count: 10 }, t0());
        sub
    }

    pub fn trial_subscription() -> Subscription {
        let mut sub = tasks_done_subscription();
        sub.start_trial(t0(), &Default::default()).unwrap();
        sub
    }
}
