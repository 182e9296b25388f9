//! Subscription handlers.
//!
//! ## Commands
//! - Creating the free record at registration
//! - Completing trial tasks and starting the trial
//! - Subscribing to and cancelling paid plans
//! - Recording free-tier usage
//! - Sweeping due expiries
//!
//! ## Queries
//! - Subscription status with entitlements
//! - Usage limit for one resource

mod cancel_subscription;
mod check_usage_limit;
mod complete_trial_task;
mod create_subscription;
mod expire_trials;
mod get_subscription_status;
mod record_usage;
mod start_trial;
mod subscribe;
mod support;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use complete_trial_task::{
    CompleteTrialTaskCommand, CompleteTrialTaskHandler, CompleteTrialTaskResult,
    MAX_SHARES_PER_CALL,
};
pub use create_subscription::{
    CreateSubscriptionCommand, CreateSubscriptionHandler, CreateSubscriptionResult,
};
pub use expire_trials::{ExpireTrialsCommand, ExpireTrialsHandler, ExpireTrialsResult};
pub use record_usage::{RecordUsageCommand, RecordUsageHandler, RecordUsageResult};
pub use start_trial::{StartTrialCommand, StartTrialHandler, StartTrialResult};
pub use subscribe::{SubscribeCommand, SubscribeHandler, SubscribeResult};

// Queries
pub use check_usage_limit::{CheckUsageLimitHandler, CheckUsageLimitQuery, CheckUsageLimitResult};
pub use get_subscription_status::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, GetSubscriptionStatusResult,
};
