//! Axum router configuration for subscription endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel, create_subscription, follow_instagram, get_plans, get_status, get_usage_limit, record_usage, share,
    start_trial, subscribe, watch_ad, SubscriptionAppState,
};

/// Create the subscription API router, mounted at `/api/subscriptions`.
///
/// # Routes
/// - `POST /` - Create the free record for a new account
/// - `GET /status` - Subscription status with entitlements
/// - `GET /limits/:resource` - Usage limit for one resource
/// - `GET /plans` - Plan catalogue
/// - `POST /trial-tasks/watch-ad`
/// - `POST /trial-tasks/follow-instagram`
/// - `POST /trial-tasks/share` - Optional body `{ "count": n }`
/// - `POST /trial` - Start the free trial
/// - `POST /subscribe` - Body `{ "plan": "monthly" | "yearly" }`
/// - `POST /cancel`
/// - `POST /usage/:resource` - Record one unit of usage
pub fn subscription_routes() -> Router<SubscriptionAppState> {
    Router::new()
        .route("/", post(create_subscription))
        .route("/status", get(get_status))
        .route("/limits/:resource", get(get_usage_limit))
        .route("/plans", get(get_plans))
        .route("/trial-tasks/watch-ad", post(watch_ad))
        .route("/trial-tasks/follow-instagram", post(follow_instagram))
        .route("/trial-tasks/share", post(share))
        .route("/trial", post(start_trial))
        .route("/subscribe", post(subscribe))
        .route("/cancel", post(cancel))
        .route("/usage/:resource", post(record_usage))
}
