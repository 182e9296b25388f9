//! Subscription module - premium entitlements for LifeBuddy.
//!
//! # Components
//!
//! - `Subscription` - The per-user record (plan, status, trial progress, usage)
//! - `evaluate` - Pure entitlement evaluation (features and usage limits)
//! - `TrialTasks` / `TrialPhase` - Trial-gate prerequisites and phases
//! - `RouteGuard` - Allow/deny decisions over evaluated entitlements
//!
//! # Plans
//!
//! | Plan | Price | Premium |
//! |------|-------|---------|
//! | Free | $0 | Only during a trial |
//! | Monthly | $9.99 | Yes |
//! | Yearly | $99.99 | Yes |

mod admin;
mod aggregate;
mod catalogue;
mod entitlement;
mod errors;
mod events;
mod feature;
mod guard;
mod plan;
mod status;
mod trial;
mod usage;

pub use admin::AdminAllowlist;
pub use aggregate::{is_expired, Subscription};
pub use catalogue::{plan_catalogue, PlanOffer};
pub use entitlement::{evaluate, Entitlements};
pub use errors::SubscriptionError;
pub use events::{
    SubscriptionActivated, SubscriptionCancelled, SubscriptionCreated, SubscriptionExpired,
    TrialExpired, TrialStarted, TrialTaskCompleted, UsageRecorded,
};
pub use feature::Feature;
pub use guard::{DenyReason, GuardDecision, GuardInput, Role, RouteGuard, LOGIN_PATH, UPGRADE_PATH};
pub use plan::Plan;
pub use status::SubscriptionStatus;
pub use trial::{TrialPhase, TrialPolicy, TrialTask, TrialTasks, REQUIRED_SHARES, TRIAL_DAYS};
pub use usage::{Limit, LimitedResource, UsageCounters, UsageLimit};
