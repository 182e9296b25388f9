//! Entitlement evaluator.
//!
//! Pure function from a subscription snapshot (plus admin flag and clock) to
//! the caller's feature map and usage limits. Safe to call repeatedly and
//! concurrently; nothing here touches I/O.
//!
//! # Rules
//!
//! | Caller | is_premium | Features | Limits |
//! |--------|-----------|----------|--------|
//! | Admin | true | all | unbounded |
//! | Paid plan | true | all | unbounded |
//! | Running trial | true | all | unbounded |
//! | Everyone else | false | free set | free ceilings |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::Timestamp;

use super::{Feature, Limit, LimitedResource, Role, Subscription, UsageLimit};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlements {
    pub is_premium: bool,
    pub role: Role,
    pub features: BTreeMap<Feature, bool>,
    pub limits: BTreeMap<LimitedResource, UsageLimit>,
}

impl Entitlements {
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.get(&feature).copied().unwrap_or(false)
    }

    pub fn limit_for(&self, resource: LimitedResource) -> UsageLimit {
        self.limits
            .get(&resource)
            .copied()
            .unwrap_or_else(UsageLimit::unlimited)
    }

    /// Looks up a limit by wire name. Unknown names are never limited.
    pub fn check_usage_limit(&self, resource_name: &str) -> UsageLimit {
        LimitedResource::lookup(resource_name)
            .map(|resource| self.limit_for(resource))
            .unwrap_or_else(UsageLimit::unlimited)
    }
}

/// Derives entitlements for one caller.
///
/// `subscription` may be `None` when the record is missing; admins are still
/// fully entitled and everyone else gets the free tier with zero usage.
pub fn evaluate(subscription: Option<&Subscription>, is_admin: bool, now: Timestamp) -> Entitlements {
    let is_premium = is_admin || subscription.map_or(false, |s| s.has_premium_access(now));

    let features = Feature::ALL
        .iter()
        .map(|feature| (*feature, is_premium || feature.is_free()))
        .collect();

    let limits = LimitedResource::ALL
        .iter()
        .map(|resource| {
            let current = subscription.map_or(0, |s| s.usage.current(*resource, now));
            let max = if is_premium {
                Limit::Unbounded
            } else {
                Limit::Bounded(resource.free_limit())
            };
            (*resource, UsageLimit::new(current, max))
        })
        .collect();

    Entitlements {
        is_premium,
        role: Role::derive(is_admin, is_premium),
        features,
        limits,
    }
}
