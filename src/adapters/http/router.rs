//! Top-level API router.
//!
//! Authentication wraps every `/api` route; `/health` stays open.

use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};

use super::middleware::{auth_middleware, require_premium, AuthState, RequireAuth};
use super::subscription::{subscription_routes, SubscriptionAppState};

/// Builds the full API.
///
/// - `/api/subscriptions/*` - see `subscription_routes`
/// - `GET /api/premium/ping` - premium-gated liveness check
/// - `GET /health`
pub fn api_router(state: SubscriptionAppState, validator: AuthState) -> Router {
    Router::new()
        .nest("/api/subscriptions", subscription_routes())
        .nest("/api/premium", premium_routes(state.clone()))
        .with_state(state)
        .layer(middleware::from_fn_with_state(validator, auth_middleware))
        .route("/health", get(health))
}

fn premium_routes(state: SubscriptionAppState) -> Router<SubscriptionAppState> {
    Router::new()
        .route("/ping", get(premium_ping))
        .route_layer(middleware::from_fn_with_state(state, require_premium))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn premium_ping(RequireAuth(user): RequireAuth) -> Json<Value> {
    Json(json!({ "pong": true, "userId": user.id.as_str() }))
}
