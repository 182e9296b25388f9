//! HTTP DTOs for subscription endpoints.
//!
//! JSON uses camelCase field names to match the LifeBuddy clients.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{
    Entitlements, Feature, LimitedResource, Plan, PlanOffer, Role, Subscription,
    SubscriptionStatus, TrialPhase, TrialTasks, UsageLimit,
};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /trial-tasks/share`. An empty body counts one share.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareRequest {
    #[serde(default)]
    pub count: Option<u32>,
}

impl ShareRequest {
    pub fn count(&self) -> u32 {
        self.count.unwrap_or(1)
    }
}

/// Body of `POST /subscribe`. The plan is parsed by the handler so an
/// unknown name surfaces as `INVALID_PLAN` rather than a JSON rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub plan: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub trial_end_date: Option<String>,
    pub trial_tasks: TrialTasks,
    pub trial_phase: TrialPhase,
    pub trial_used: bool,
    pub premium_badge: bool,
    pub cancelled_at: Option<String>,
    pub is_premium: bool,
    pub role: Role,
    pub features: BTreeMap<Feature, bool>,
    /// Current counter per limited resource.
    pub usage: BTreeMap<LimitedResource, u32>,
    pub limits: BTreeMap<LimitedResource, UsageLimit>,
}

impl SubscriptionStatusResponse {
    pub fn new(subscription: &Subscription, entitlements: Entitlements, phase: TrialPhase) -> Self {
        let usage = entitlements
            .limits
            .iter()
            .map(|(resource, limit)| (*resource, limit.current))
            .collect();

        Self {
            plan: subscription.plan,
            status: subscription.status,
            start_date: subscription.period_start.map(rfc3339),
            end_date: subscription.period_end.map(rfc3339),
            trial_end_date: subscription.trial_end_date.map(rfc3339),
            trial_tasks: subscription.trial_tasks,
            trial_phase: phase,
            trial_used: subscription.trial_used,
            premium_badge: subscription.premium_badge,
            cancelled_at: subscription.cancelled_at.map(rfc3339),
            is_premium: entitlements.is_premium,
            role: entitlements.role,
            features: entitlements.features,
            usage,
            limits: entitlements.limits,
        }
    }
}

/// Response for trial task completion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialTaskResponse {
    pub trial_tasks: TrialTasks,
    pub trial_phase: TrialPhase,
    /// Tasks still blocking the trial, e.g. `"share (4/10)"`.
    pub missing: Vec<String>,
    pub can_start_trial: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTrialResponse {
    pub message: String,
    pub trial_end_date: String,
    pub features: BTreeMap<Feature, bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub message: String,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub end_date: String,
    pub premium_badge: bool,
    pub badge_granted: bool,
    pub features: BTreeMap<Feature, bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub message: String,
    /// Premium access ends at this instant.
    pub access_until: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimitResponse {
    pub resource: String,
    pub current: u32,
    /// `null` when unbounded.
    pub limit: Option<u32>,
    pub reached: bool,
    pub is_premium: bool,
}

impl UsageLimitResponse {
    pub fn new(resource: impl Into<String>, limit: UsageLimit, is_premium: bool) -> Self {
        Self {
            resource: resource.into(),
            current: limit.current,
            limit: limit.max.into(),
            reached: limit.reached,
            is_premium,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUsageResponse {
    #[serde(flatten)]
    pub limit: UsageLimitResponse,
    /// False when the caller is unlimited and nothing was counted.
    pub recorded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<PlanOffer>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response body: `{ error, code, ...details }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Error code for programmatic handling.
    pub code: String,
    /// Extra fields merged into the top-level object.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

fn rfc3339(ts: Timestamp) -> String {
    ts.as_datetime().to_rfc3339()
}
