//! Subscription repository port.
//!
//! Defines the contract for persisting and retrieving Subscription records.
//!
//! # Design
//!
//! - **One record per user**: `user_id` is unique
//! - **Never hard-deleted**: expiry is a state, not a removal
//! - **Atomic task progress**: trial tasks are applied with
//!   `apply_trial_task`, never through `update`, so concurrent completions
//!   for one user cannot overwrite each other

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::subscription::{Subscription, TrialTask};

/// Repository port for Subscription persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Save a new subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists` if the user already has one
    /// - `DatabaseError` on persistence failure
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing subscription. Last writer wins.
    ///
    /// Trial task progress is left untouched; see `apply_trial_task`.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if no record exists for the user
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Find the subscription for a user. `None` if the user has none.
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError>;

    /// Applies one trial task as a single atomic step and returns the
    /// updated record.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if no record exists for the user
    /// - `DatabaseError` on persistence failure
    async fn apply_trial_task(
        &self,
        user_id: &UserId,
        task: TrialTask,
        now: Timestamp,
    ) -> Result<Subscription, DomainError>;

    /// Subscriptions in trial whose end date is at or before `cutoff`.
    async fn find_trials_ending_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Active or cancelled paid subscriptions whose period ended at or
    /// before `cutoff`.
    async fn find_paid_periods_ending_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;
}
