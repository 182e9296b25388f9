//! In-memory implementation of SubscriptionRepository.
//!
//! Used when no database is configured, and by tests. Every write happens
//! inside a single write-lock critical section.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::subscription::{Subscription, SubscriptionStatus, TrialTask};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: Arc<RwLock<HashMap<UserId, Subscription>>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

fn not_found(user_id: &UserId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("No subscription found for user: {}", user_id),
    )
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions.contains_key(&subscription.user_id) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionExists,
                "User already has a subscription",
            ));
        }
        subscriptions.insert(subscription.user_id.clone(), subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        let stored = subscriptions
            .get_mut(&subscription.user_id)
            .ok_or_else(|| not_found(&subscription.user_id))?;

        // Task progress only moves through apply_trial_task.
        let trial_tasks = stored.trial_tasks;
        *stored = subscription.clone();
        stored.trial_tasks = trial_tasks;
        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.subscriptions.read().await.get(user_id).cloned())
    }

    async fn apply_trial_task(
        &self,
        user_id: &UserId,
        task: TrialTask,
        now: Timestamp,
    ) -> Result<Subscription, DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        let stored = subscriptions.get_mut(user_id).ok_or_else(|| not_found(user_id))?;
        stored.complete_trial_task(task, now);
        Ok(stored.clone())
    }

    async fn find_trials_ending_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .await
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
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| s.paid_period_lapsed(cutoff))
            .cloned()
            .collect())
    }
}
