//! Subscription aggregate entity.
//!
//! One record per user, created at registration on the free plan and never
//! hard-deleted. Feature access is not stored here; it is always derived by
//! [`evaluate`](super::evaluate).
//!
//! # Invariants
//!
//! - `status == Trial` implies `trial_end_date` is set and every trial task is complete
//! - `plan == Free` implies `status` is `Active`, `Expired`, or `Trial`
//! - Usage counters never go negative
//! - Every time-driven rule takes `now` explicitly

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, SubscriptionId, Timestamp, UserId};

use super::{
    LimitedResource, Plan, SubscriptionError, SubscriptionStatus, TrialPhase, TrialPolicy,
    TrialTask, TrialTasks, UsageCounters,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan: Plan,
    pub status: SubscriptionStatus,

    /// Set only while `status == Trial`.
    pub trial_end_date: Option<Timestamp>,

    pub trial_tasks: TrialTasks,

    /// A trial has been granted at some point. Trials are once per account.
    pub trial_used: bool,

    pub usage: UsageCounters,

    /// Cosmetic marker granted on the first paid conversion.
    pub premium_badge: bool,
    pub badge_granted_at: Option<Timestamp>,

    /// Current billing period. Only set for paid plans.
    pub period_start: Option<Timestamp>,
    pub period_end: Option<Timestamp>,

    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The single authoritative trial-expiry predicate.
///
/// Shared by the entitlement evaluator, the status read path and the
/// reconciliation sweep.
pub fn is_expired(subscription: &Subscription, now: Timestamp) -> bool {
    subscription.status == SubscriptionStatus::Trial
        && subscription
            .trial_end_date
            .map_or(true, |end| !now.is_before(&end))
}

impl Subscription {
    /// Creates the record every account starts with: free, active, zero usage.
    pub fn new_free(user_id: UserId, now: Timestamp) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            plan: Plan::Free,
            status: SubscriptionStatus::Active,
            trial_end_date: None,
            trial_tasks: TrialTasks::default(),
            trial_used: false,
            usage: UsageCounters::new(now),
            premium_badge: false,
            badge_granted_at: None,
            period_start: None,
            period_end: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        is_expired(self, now)
    }

    /// Premium by a paid period that has not lapsed, or by a trial that has
    /// not yet run out. Holds for unreconciled snapshots too.
    pub fn has_premium_access(&self, now: Timestamp) -> bool {
        (self.plan.is_paid() && !self.paid_period_lapsed(now))
            || (self.status == SubscriptionStatus::Trial && !self.is_expired(now))
    }

    pub fn trial_phase(&self, now: Timestamp, policy: &TrialPolicy) -> TrialPhase {
        if self.status == SubscriptionStatus::Trial {
            if self.is_expired(now) {
                TrialPhase::TrialExpired
            } else {
                TrialPhase::TrialActive
            }
        } else if self.trial_used {
            TrialPhase::TrialExpired
        } else if self.trial_tasks.is_complete(policy) {
            TrialPhase::TasksComplete
        } else if self.trial_tasks.any_started() {
            TrialPhase::TasksIncomplete
        } else {
            TrialPhase::NoTrialRequested
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Trial gate
    // ─────────────────────────────────────────────────────────────────────

    /// Marks a prerequisite task. Returns true if progress changed.
    pub fn complete_trial_task(&mut self, task: TrialTask, now: Timestamp) -> bool {
        let changed = self.trial_tasks.complete(task);
        if changed {
            self.updated_at = now;
        }
        changed
    }

    /// Starts the premium trial and returns its end date.
    ///
    /// # Errors
    ///
    /// - `AlreadyEntitled` on a paid plan, during a running trial, or once a
    ///   trial has been used
    /// - `InvalidState` if the free plan is not `Active`
    /// - `PrerequisiteNotMet` if any task is outstanding; nothing is mutated
    pub fn start_trial(
        &mut self,
        now: Timestamp,
        policy: &TrialPolicy,
    ) -> Result<Timestamp, SubscriptionError> {
        self.expire_trial_if_due(now);

        if self.plan.is_paid() {
            return Err(SubscriptionError::already_entitled(format!(
                "You already have premium access on the {} plan",
                self.plan
            )));
        }
        if self.status == SubscriptionStatus::Trial {
            return Err(SubscriptionError::already_entitled(
                "Your free trial is already active",
            ));
        }
        if self.trial_used {
            return Err(SubscriptionError::already_entitled(
                "Your free trial has already been used",
            ));
        }
        if self.status != SubscriptionStatus::Active {
            return Err(SubscriptionError::invalid_state(
                self.status.as_str(),
                "start a trial",
            ));
        }

        let missing = self.trial_tasks.missing(policy);
        if !missing.is_empty() {
            return Err(SubscriptionError::prerequisite_not_met(missing));
        }

        self.transition_to(SubscriptionStatus::Trial)?;
        let trial_end = now.add_days(i64::from(policy.trial_days));
        self.trial_end_date = Some(trial_end);
        self.trial_used = true;
        self.updated_at = now;
        Ok(trial_end)
    }

    /// Ends a trial whose end date has passed. Returns true only on the call
    /// that performed the transition.
    pub fn expire_trial_if_due(&mut self, now: Timestamp) -> bool {
        if !self.is_expired(now) {
            return false;
        }
        self.status = SubscriptionStatus::Active;
        self.plan = Plan::Free;
        self.trial_end_date = None;
        self.updated_at = now;
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Paid plans
    // ─────────────────────────────────────────────────────────────────────

    /// Moves onto a paid plan and returns the end of the new billing period.
    ///
    /// Payment capture happens elsewhere; this only records the outcome.
    pub fn subscribe(&mut self, plan: Plan, now: Timestamp) -> Result<Timestamp, SubscriptionError> {
        let period_end = plan
            .period_end(now)
            .ok_or_else(|| SubscriptionError::invalid_plan(plan.as_str()))?;

        if self.plan == plan
            && self.status == SubscriptionStatus::Active
            && !self.paid_period_lapsed(now)
        {
            return Err(SubscriptionError::already_entitled(format!(
                "You are already subscribed to the {} plan",
                plan
            )));
        }

        self.transition_to(SubscriptionStatus::Active)?;
        self.plan = plan;
        self.period_start = Some(now);
        self.period_end = Some(period_end);
        self.trial_end_date = None;
        self.cancelled_at = None;
        if !self.premium_badge {
            self.premium_badge = true;
            self.badge_granted_at = Some(now);
        }
        self.updated_at = now;
        Ok(period_end)
    }

    /// Cancels a paid plan. Access continues until the returned instant.
    pub fn cancel(&mut self, now: Timestamp) -> Result<Timestamp, SubscriptionError> {
        if !self.plan.is_paid() {
            return Err(SubscriptionError::invalid_state("on the free plan", "cancel"));
        }
        self.transition_to(SubscriptionStatus::Cancelled)?;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(self.period_end.unwrap_or(now))
    }

    /// True when a paid period has run out and not been renewed.
    pub fn paid_period_lapsed(&self, now: Timestamp) -> bool {
        self.plan.is_paid()
            && matches!(
                self.status,
                SubscriptionStatus::Active | SubscriptionStatus::Cancelled
            )
            && self.period_end.map_or(false, |end| !now.is_before(&end))
    }

    /// Drops a lapsed paid plan back to free/expired.
    pub fn expire_paid_if_due(&mut self, now: Timestamp) -> bool {
        if !self.paid_period_lapsed(now) {
            return false;
        }
        self.status = SubscriptionStatus::Expired;
        self.plan = Plan::Free;
        self.updated_at = now;
        true
    }

    /// Applies every time-driven transition that is due. Returns true if
    /// anything changed.
    pub fn reconcile(&mut self, now: Timestamp) -> bool {
        let trial = self.expire_trial_if_due(now);
        let paid = self.expire_paid_if_due(now);
        trial || paid
    }

    // ─────────────────────────────────────────────────────────────────────
    // Usage
    // ─────────────────────────────────────────────────────────────────────

    pub fn record_usage(&mut self, resource: LimitedResource, now: Timestamp) -> u32 {
        let value = self.usage.increment(resource, now);
        self.updated_at = now;
        value
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), SubscriptionError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            SubscriptionError::invalid_state(
                self.status.as_str(),
                format!("move to {}", target),
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn user() -> UserId {
        UserId::new("user-123").unwrap()
    }

    fn t0() -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap())
    }

    fn policy() -> TrialPolicy {
        TrialPolicy::default()
    }

    fn with_all_tasks() -> Subscription {
        let mut sub = Subscription::new_free(user(), t0());
        sub.complete_trial_task(TrialTask::WatchAd, t0());
        sub.complete_trial_task(TrialTask::FollowInstagram, t0());
        sub.complete_trial_task(TrialTask::Share { count: 10 }, t0());
        sub
    }

    // Construction

    #[test]
    fn new_free_starts_active_with_zero_usage() {
        let sub = Subscription::new_free(user(), t0());

        assert_eq!(sub.plan, Plan::Free);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.usage, UsageCounters::new(t0()));
        assert!(sub.trial_end_date.is_none());
        assert!(!sub.premium_badge);
        assert_eq!(sub.trial_phase(t0(), &policy()), TrialPhase::NoTrialRequested);
    }

    // Trial gate

    #[test]
    fn start_trial_with_partial_shares_fails_without_mutation() {
        let mut sub = Subscription::new_free(user(), t0());
        sub.complete_trial_task(TrialTask::WatchAd, t0());
        sub.complete_trial_task(TrialTask::FollowInstagram, t0());
        sub.complete_trial_task(TrialTask::Share { count: 4 }, t0());
        let before = sub.clone();

        let err = sub.start_trial(t0(), &policy()).unwrap_err();

        assert_eq!(
            err,
            SubscriptionError::prerequisite_not_met(vec!["share (4/10)".to_string()])
        );
        assert_eq!(sub, before);
        assert_eq!(sub.trial_phase(t0(), &policy()), TrialPhase::TasksIncomplete);
    }

    #[test]
    fn start_trial_sets_seven_day_window() {
        let mut sub = with_all_tasks();
        assert_eq!(sub.trial_phase(t0(), &policy()), TrialPhase::TasksComplete);

        let end = sub.start_trial(t0(), &policy()).unwrap();

        assert_eq!(end, t0().add_days(7));
        assert_eq!(sub.status, SubscriptionStatus::Trial);
        assert_eq!(sub.plan, Plan::Free);
        assert_eq!(sub.trial_end_date, Some(end));
        assert!(sub.has_premium_access(t0()));
        assert_eq!(sub.trial_phase(t0(), &policy()), TrialPhase::TrialActive);
    }

    #[test]
    fn start_trial_twice_is_already_entitled() {
        let mut sub = with_all_tasks();
        sub.start_trial(t0(), &policy()).unwrap();

        let err = sub.start_trial(t0().add_days(1), &policy()).unwrap_err();

        assert!(matches!(err, SubscriptionError::AlreadyEntitled { .. }));
    }

    #[test]
    fn start_trial_on_paid_plan_is_already_entitled() {
        let mut sub = with_all_tasks();
        sub.subscribe(Plan::Yearly, t0()).unwrap();

        let err = sub.start_trial(t0(), &policy()).unwrap_err();

        assert!(matches!(err, SubscriptionError::AlreadyEntitled { .. }));
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn trial_cannot_be_restarted_after_expiry() {
        let mut sub = with_all_tasks();
        sub.start_trial(t0(), &policy()).unwrap();

        let err = sub.start_trial(t0().add_days(8), &policy()).unwrap_err();

        assert_eq!(
            err,
            SubscriptionError::already_entitled("Your free trial has already been used")
        );
        assert_eq!(sub.status, SubscriptionStatus::Active, "expiry still applied");
        assert_eq!(sub.trial_phase(t0().add_days(8), &policy()), TrialPhase::TrialExpired);
    }

    #[test]
    fn is_expired_flips_exactly_at_trial_end() {
        let mut sub = with_all_tasks();
        let end = sub.start_trial(t0(), &policy()).unwrap();

        let just_before = Timestamp::from_datetime(*end.as_datetime() - chrono::Duration::seconds(1));
        assert!(!is_expired(&sub, just_before));
        assert!(is_expired(&sub, end));
        assert!(!sub.has_premium_access(end));
    }

    #[test]
    fn expire_trial_if_due_is_idempotent() {
        let mut sub = with_all_tasks();
        sub.start_trial(t0(), &policy()).unwrap();
        let later = t0().add_days(7);

        assert!(sub.expire_trial_if_due(later));
        let after_first = sub.clone();
        assert!(!sub.expire_trial_if_due(later));
        assert!(!sub.expire_trial_if_due(later.add_days(30)));

        assert_eq!(sub, after_first);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.plan, Plan::Free);
        assert!(sub.trial_end_date.is_none());
    }

    #[test]
    fn expire_trial_if_due_ignores_running_trial() {
        let mut sub = with_all_tasks();
        sub.start_trial(t0(), &policy()).unwrap();

        assert!(!sub.expire_trial_if_due(t0().add_days(6)));
        assert_eq!(sub.status, SubscriptionStatus::Trial);
    }

    // Paid plans

    #[test]
    fn subscribe_sets_period_and_badge_once() {
        let mut sub = Subscription::new_free(user(), t0());

        let end = sub.subscribe(Plan::Monthly, t0()).unwrap();

        assert_eq!(end, t0().add_months(1));
        assert_eq!(sub.period_start, Some(t0()));
        assert!(sub.premium_badge);
        assert_eq!(sub.badge_granted_at, Some(t0()));

        sub.subscribe(Plan::Yearly, t0().add_days(3)).unwrap();
        assert_eq!(sub.badge_granted_at, Some(t0()), "badge is granted once");
        assert_eq!(sub.plan, Plan::Yearly);
    }

    #[test]
    fn subscribe_from_trial_clears_trial_window() {
        let mut sub = with_all_tasks();
        sub.start_trial(t0(), &policy()).unwrap();

        sub.subscribe(Plan::Monthly, t0().add_days(2)).unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.trial_end_date.is_none());
    }

    #[test]
    fn subscribe_to_free_is_invalid_plan() {
        let mut sub = Subscription::new_free(user(), t0());
        assert_eq!(
            sub.subscribe(Plan::Free, t0()).unwrap_err(),
            SubscriptionError::invalid_plan("free")
        );
    }

    #[test]
    fn subscribe_to_current_plan_is_already_entitled() {
        let mut sub = Subscription::new_free(user(), t0());
        sub.subscribe(Plan::Monthly, t0()).unwrap();

        let err = sub.subscribe(Plan::Monthly, t0().add_days(1)).unwrap_err();
        assert!(matches!(err, SubscriptionError::AlreadyEntitled { .. }));
    }

    #[test]
    fn cancel_free_plan_is_rejected() {
        let mut sub = Subscription::new_free(user(), t0());
        let err = sub.cancel(t0()).unwrap_err();
        assert!(matches!(err, SubscriptionError::InvalidState { .. }));
    }

    #[test]
    fn cancelled_plan_keeps_access_until_period_end() {
        let mut sub = Subscription::new_free(user(), t0());
        let end = sub.subscribe(Plan::Monthly, t0()).unwrap();

        let effective = sub.cancel(t0().add_days(5)).unwrap();

        assert_eq!(effective, end);
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert_eq!(sub.cancelled_at, Some(t0().add_days(5)));
        assert!(sub.has_premium_access(t0().add_days(20)));
        assert!(!sub.expire_paid_if_due(t0().add_days(20)));

        assert!(sub.expire_paid_if_due(end));
        assert_eq!(sub.plan, Plan::Free);
        assert_eq!(sub.status, SubscriptionStatus::Expired);
        assert!(!sub.has_premium_access(end));
    }

    #[test]
    fn lapsed_paid_snapshot_loses_access_before_reconcile() {
        let mut sub = Subscription::new_free(user(), t0());
        let end = sub.subscribe(Plan::Monthly, t0()).unwrap();
        sub.cancel(t0()).unwrap();

        assert!(sub.has_premium_access(t0().add_days(10)));
        assert!(!sub.has_premium_access(end));
        assert!(!sub.has_premium_access(t0().add_days(60)));
        assert_eq!(sub.plan, Plan::Monthly);
    }

    #[test]
    fn cancel_twice_is_invalid_state() {
        let mut sub = Subscription::new_free(user(), t0());
        sub.subscribe(Plan::Yearly, t0()).unwrap();
        sub.cancel(t0()).unwrap();

        assert!(matches!(
            sub.cancel(t0()),
            Err(SubscriptionError::InvalidState { .. })
        ));
    }

    #[test]
    fn reconcile_reports_any_change() {
        let mut sub = with_all_tasks();
        sub.start_trial(t0(), &policy()).unwrap();

        assert!(!sub.reconcile(t0().add_days(1)));
        assert!(sub.reconcile(t0().add_days(10)));
        assert!(!sub.reconcile(t0().add_days(11)));
    }

    // Usage

    #[test]
    fn record_usage_increments_and_touches_updated_at() {
        let mut sub = Subscription::new_free(user(), t0());
        let later = Timestamp::from_datetime(*t0().as_datetime() + chrono::Duration::minutes(1));

        assert_eq!(sub.record_usage(LimitedResource::Templates, later), 1);
        assert_eq!(sub.record_usage(LimitedResource::Templates, later), 2);
        assert_eq!(sub.updated_at, later);
    }
}
