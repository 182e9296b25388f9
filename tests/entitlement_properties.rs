//! Property tests for the entitlement evaluator.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use lifebuddy::domain::foundation::{Timestamp, UserId};
use lifebuddy::domain::subscription::{
    evaluate, Feature, Limit, LimitedResource, Plan, Role, Subscription, TrialPolicy, TrialTask,
    UsageLimit,
};

fn start() -> Timestamp {
    Timestamp::from_datetime(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap())
}

fn free_subscription() -> Subscription {
    Subscription::new_free(UserId::new("prop-user").unwrap(), start())
}

fn paid_plan() -> impl Strategy<Value = Plan> {
    prop_oneof![Just(Plan::Monthly), Just(Plan::Yearly)]
}

fn resource() -> impl Strategy<Value = LimitedResource> {
    prop::sample::select(LimitedResource::ALL.to_vec())
}

proptest! {
    #[test]
    fn paid_plans_are_premium_within_their_period(plan in paid_plan(), days in 0i64..28) {
        let mut sub = free_subscription();
        sub.subscribe(plan, start()).unwrap();

        let e = evaluate(Some(&sub), false, start().add_days(days));

        prop_assert!(e.is_premium);
        prop_assert_eq!(e.role, Role::Premium);
        prop_assert!(Feature::ALL.iter().all(|f| e.has_feature(*f)));
        prop_assert!(e.limits.values().all(|l| l.max == Limit::Unbounded && !l.reached));
    }

    #[test]
    fn free_users_get_exactly_the_free_set(
        active_events in 0u32..20,
        mood_entries in 0u32..20,
        templates in 0u32..20,
    ) {
        let mut sub = free_subscription();
        sub.usage.active_events = active_events;
        sub.usage.mood_entries = mood_entries;
        sub.usage.templates = templates;

        let e = evaluate(Some(&sub), false, start());

        prop_assert!(!e.is_premium);
        for feature in Feature::ALL {
            prop_assert_eq!(e.has_feature(feature), feature.is_free());
        }
        for resource in LimitedResource::ALL {
            let limit = e.limit_for(resource);
            prop_assert_eq!(limit.max, Limit::Bounded(resource.free_limit()));
            prop_assert_eq!(limit.reached, limit.current >= resource.free_limit());
        }
    }

    #[test]
    fn admins_are_fully_entitled_whatever_the_record(
        has_record in any::<bool>(),
        usage in 0u32..50,
        resource in resource(),
    ) {
        let mut sub = free_subscription();
        sub.usage.templates = usage;
        let record = has_record.then_some(&sub);

        let e = evaluate(record, true, start());

        prop_assert!(e.is_premium);
        prop_assert_eq!(e.role, Role::Admin);
        prop_assert!(Feature::ALL.iter().all(|f| e.has_feature(*f)));
        prop_assert!(!e.limit_for(resource).reached);
    }

    #[test]
    fn bounded_limit_is_reached_at_or_over_max(current in 0u32..1000, max in 0u32..1000) {
        let limit = UsageLimit::new(current, Limit::Bounded(max));
        prop_assert_eq!(limit.reached, current >= max);
    }

    #[test]
    fn unbounded_limit_is_never_reached(current in any::<u32>()) {
        prop_assert!(!UsageLimit::new(current, Limit::Unbounded).reached);
    }

    #[test]
    fn unknown_resource_names_are_never_limited(name in "[a-z]{1,12}") {
        prop_assume!(LimitedResource::lookup(&name).is_none());
        let e = evaluate(Some(&free_subscription()), false, start());

        prop_assert_eq!(e.check_usage_limit(&name), UsageLimit::unlimited());
    }

    #[test]
    fn trial_is_premium_only_until_its_end(days in 0i64..14) {
        let policy = TrialPolicy::default();
        let mut sub = free_subscription();
        sub.complete_trial_task(TrialTask::WatchAd, start());
        sub.complete_trial_task(TrialTask::FollowInstagram, start());
        sub.complete_trial_task(TrialTask::Share { count: policy.required_shares }, start());
        sub.start_trial(start(), &policy).unwrap();

        let e = evaluate(Some(&sub), false, start().add_days(days));

        prop_assert_eq!(e.is_premium, days < i64::from(policy.trial_days));
    }

    #[test]
    fn share_counts_accumulate(counts in prop::collection::vec(1u32..20, 0..10)) {
        let mut sub = free_subscription();
        for count in &counts {
            sub.complete_trial_task(TrialTask::Share { count: *count }, start());
        }

        prop_assert_eq!(sub.trial_tasks.shares, counts.iter().sum::<u32>());
    }
}
