//! Premium gates: route middleware that enforces entitlements server-side.
//!
//! - `require_premium` - premium or admin role required
//! - `require_feature` - one feature must be enabled
//! - `require_usage` - the free-tier ceiling for a resource must not be reached
//!
//! Gates run after `auth_middleware` and resolve entitlements through the
//! subscription status and usage-limit handlers, so a lapsed trial is
//! reconciled before the decision. A denied request never reaches the inner
//! handler.
//!
//! ```ignore
//! Router::new()
//!     .route("/ping", get(ping))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_premium));
//!
//! Router::new()
//!     .route("/insights", get(insights))
//!     .route_layer(middleware::from_fn_with_state(
//!         require_feature(state.clone(), Feature::AiInsights),
//!         enforce_gate,
//!     ));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::adapters::http::subscription::{SubscriptionApiError, SubscriptionAppState};
use crate::application::handlers::subscription::{CheckUsageLimitQuery, GetSubscriptionStatusQuery};
use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::domain::subscription::{
    DenyReason, Feature, GuardDecision, GuardInput, LimitedResource, RouteGuard, SubscriptionError,
};

#[derive(Debug, Clone)]
enum GateRule {
    Guard(RouteGuard),
    Usage(LimitedResource),
}

/// Middleware state pairing the subscription handlers with one access rule.
#[derive(Clone)]
pub struct PremiumGate {
    state: SubscriptionAppState,
    rule: GateRule,
}

impl PremiumGate {
    /// Gate with an arbitrary route guard, e.g. admin only.
    pub fn guard(state: SubscriptionAppState, guard: RouteGuard) -> Self {
        Self {
            state,
            rule: GateRule::Guard(guard),
        }
    }
}

/// Gate that admits callers with `feature` enabled. Use with `enforce_gate`.
pub fn require_feature(state: SubscriptionAppState, feature: Feature) -> PremiumGate {
    PremiumGate::guard(state, RouteGuard::require_feature(feature))
}

/// Gate that admits callers below the ceiling for `resource`. Use with `enforce_gate`.
pub fn require_usage(state: SubscriptionAppState, resource: LimitedResource) -> PremiumGate {
    PremiumGate {
        state,
        rule: GateRule::Usage(resource),
    }
}

/// Middleware admitting premium and admin callers only.
pub async fn require_premium(
    State(state): State<SubscriptionAppState>,
    request: Request,
    next: Next,
) -> Response {
    let rule = GateRule::Guard(RouteGuard::default());
    enforce(&state, &rule, request, next).await
}

/// Middleware running the rule carried by a `PremiumGate`.
pub async fn enforce_gate(State(gate): State<PremiumGate>, request: Request, next: Next) -> Response {
    enforce(&gate.state, &gate.rule, request, next).await
}

async fn enforce(
    state: &SubscriptionAppState,
    rule: &GateRule,
    request: Request,
    next: Next,
) -> Response {
    let user = request.extensions().get::<AuthenticatedUser>().cloned();

    match check(state, rule, user).await {
        Ok(()) => next.run(request).await,
        Err(err) => SubscriptionApiError::from(err).into_response(),
    }
}

async fn check(
    state: &SubscriptionAppState,
    rule: &GateRule,
    user: Option<AuthenticatedUser>,
) -> Result<(), SubscriptionError> {
    let Some(user) = user else {
        return Err(SubscriptionError::access_denied(DenyReason::Unauthenticated));
    };
    let now = Timestamp::now();

    match rule {
        GateRule::Guard(guard) => {
            let user_id = user.id.clone();
            let status = state
                .status_handler()
                .handle(GetSubscriptionStatusQuery { user, now })
                .await?;

            match guard.decide(&GuardInput::Ready(status.entitlements)) {
                GuardDecision::Allow => Ok(()),
                GuardDecision::Deny(reason) => {
                    tracing::info!(user_id = %user_id, reason = ?reason, "premium gate denied request");
                    Err(SubscriptionError::access_denied(reason))
                }
                GuardDecision::Pending => Err(SubscriptionError::infrastructure(
                    "entitlements were not resolved",
                )),
            }
        }
        GateRule::Usage(resource) => {
            let user_id = user.id.clone();
            let result = state
                .usage_limit_handler()
                .handle(CheckUsageLimitQuery {
                    user,
                    resource: resource.as_str().to_string(),
                    now,
                })
                .await?;

            if result.limit.reached {
                tracing::info!(user_id = %user_id, resource = %resource, current = result.limit.current, "usage gate denied request");
                return Err(SubscriptionError::limit_reached(
                    *resource,
                    result.limit.current,
                    resource.free_limit(),
                ));
            }
            Ok(())
        }
    }
}
