//! HTTP handlers for subscription endpoints.
//!
//! These handlers connect Axum routes to the subscription command/query handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CheckUsageLimitHandler,
    CheckUsageLimitQuery, CompleteTrialTaskCommand, CreateSubscriptionCommand,
    CreateSubscriptionHandler, CompleteTrialTaskHandler,
    CompleteTrialTaskResult, GetSubscriptionStatusHandler, GetSubscriptionStatusQuery,
    RecordUsageCommand, RecordUsageHandler, StartTrialCommand, StartTrialHandler,
    SubscribeCommand, SubscribeHandler,
};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::subscription::{
    evaluate, plan_catalogue, AdminAllowlist, DenyReason, Limit, Plan, SubscriptionError,
    TrialPhase, TrialPolicy, TrialTask,
};
use crate::ports::{EventPublisher, SubscriptionRepository};

use super::dto::{
    CancelResponse, ErrorResponse, PlansResponse, RecordUsageResponse, ShareRequest,
    StartTrialResponse, SubscribeRequest, SubscribeResponse, SubscriptionStatusResponse,
    TrialTaskResponse, UsageLimitResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for subscription routes and the premium gates.
///
/// Cloned per request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct SubscriptionAppState {
    pub repository: Arc<dyn SubscriptionRepository>,
    pub event_publisher: Arc<dyn EventPublisher>,
    pub admins: Arc<AdminAllowlist>,
    pub trial_policy: TrialPolicy,
}

impl SubscriptionAppState {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        admins: AdminAllowlist,
        trial_policy: TrialPolicy,
    ) -> Self {
        Self {
            repository,
            event_publisher,
            admins: Arc::new(admins),
            trial_policy,
        }
    }

    pub fn create_handler(&self) -> CreateSubscriptionHandler {
        CreateSubscriptionHandler::new(self.repository.clone(), self.event_publisher.clone())
    }

    pub fn status_handler(&self) -> GetSubscriptionStatusHandler {
        GetSubscriptionStatusHandler::new(
            self.repository.clone(),
            self.event_publisher.clone(),
            self.admins.clone(),
        )
    }

    pub fn usage_limit_handler(&self) -> CheckUsageLimitHandler {
        CheckUsageLimitHandler::new(
            self.repository.clone(),
            self.event_publisher.clone(),
            self.admins.clone(),
        )
    }

    pub fn record_usage_handler(&self) -> RecordUsageHandler {
        RecordUsageHandler::new(
            self.repository.clone(),
            self.event_publisher.clone(),
            self.admins.clone(),
        )
    }

    pub fn trial_task_handler(&self) -> CompleteTrialTaskHandler {
        CompleteTrialTaskHandler::new(
            self.repository.clone(),
            self.event_publisher.clone(),
            self.trial_policy,
        )
    }

    pub fn start_trial_handler(&self) -> StartTrialHandler {
        StartTrialHandler::new(
            self.repository.clone(),
            self.event_publisher.clone(),
            self.trial_policy,
        )
    }

    pub fn subscribe_handler(&self) -> SubscribeHandler {
        SubscribeHandler::new(self.repository.clone(), self.event_publisher.clone())
    }

    pub fn cancel_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.repository.clone(), self.event_publisher.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/subscriptions/status
pub async fn get_status(
    State(state): State<SubscriptionAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let now = Timestamp::now();
    let result = state
        .status_handler()
        .handle(GetSubscriptionStatusQuery { user, now })
        .await?;

    let phase = result.subscription.trial_phase(now, &state.trial_policy);
    Ok(Json(SubscriptionStatusResponse::new(
        &result.subscription,
        result.entitlements,
        phase,
    )))
}

/// GET /api/subscriptions/limits/:resource
pub async fn get_usage_limit(
    State(state): State<SubscriptionAppState>,
    RequireAuth(user): RequireAuth,
    Path(resource): Path<String>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let result = state
        .usage_limit_handler()
        .handle(CheckUsageLimitQuery {
            user,
            resource,
            now: Timestamp::now(),
        })
        .await?;

    Ok(Json(UsageLimitResponse::new(
        result.resource,
        result.limit,
        result.is_premium,
    )))
}

/// GET /api/subscriptions/plans
pub async fn get_plans() -> impl IntoResponse {
    Json(PlansResponse {
        plans: plan_catalogue(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/subscriptions
///
/// Registration hook. 409 if the caller already has a record.
pub async fn create_subscription(
    State(state): State<SubscriptionAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let now = Timestamp::now();
    let is_admin = state.admins.is_admin(&user);
    let result = state
        .create_handler()
        .handle(CreateSubscriptionCommand {
            user_id: user.id,
            now,
        })
        .await?;

    let entitlements = evaluate(Some(&result.subscription), is_admin, now);
    let phase = result.subscription.trial_phase(now, &state.trial_policy);
    Ok((
        StatusCode::CREATED,
        Json(SubscriptionStatusResponse::new(
            &result.subscription,
            entitlements,
            phase,
        )),
    ))
}

/// POST /api/subscriptions/trial-tasks/watch-ad
pub async fn watch_ad(
    State(state): State<SubscriptionAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    complete_task(&state, user.id, TrialTask::WatchAd).await
}

/// POST /api/subscriptions/trial-tasks/follow-instagram
pub async fn follow_instagram(
    State(state): State<SubscriptionAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    complete_task(&state, user.id, TrialTask::FollowInstagram).await
}

/// POST /api/subscriptions/trial-tasks/share
///
/// An empty body counts one share. A body that is present must be a valid
/// `ShareRequest`, otherwise nothing is counted and the call is a 400.
pub async fn share(
    State(state): State<SubscriptionAppState>,
    RequireAuth(user): RequireAuth,
    body: Bytes,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let count = share_count(&body)?;
    let task = TrialTask::Share { count };
    complete_task(&state, user.id, task).await
}

fn share_count(body: &[u8]) -> Result<u32, SubscriptionError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(1);
    }
    let Json(request) = Json::<ShareRequest>::from_bytes(body)
        .map_err(|rejection| SubscriptionError::validation("count", rejection.body_text()))?;
    Ok(request.count())
}

async fn complete_task(
    state: &SubscriptionAppState,
    user_id: UserId,
    task: TrialTask,
) -> Result<Json<TrialTaskResponse>, SubscriptionApiError> {
    let CompleteTrialTaskResult {
        subscription,
        phase,
        missing,
    } = state
        .trial_task_handler()
        .handle(CompleteTrialTaskCommand {
            user_id,
            task,
            now: Timestamp::now(),
        })
        .await?;

    Ok(Json(TrialTaskResponse {
        trial_tasks: subscription.trial_tasks,
        trial_phase: phase,
        missing,
        can_start_trial: phase == TrialPhase::TasksComplete,
    }))
}

/// POST /api/subscriptions/trial
pub async fn start_trial(
    State(state): State<SubscriptionAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let now = Timestamp::now();
    let is_admin = state.admins.is_admin(&user);
    let result = state
        .start_trial_handler()
        .handle(StartTrialCommand {
            user_id: user.id,
            now,
        })
        .await?;

    let entitlements = evaluate(Some(&result.subscription), is_admin, now);
    Ok(Json(StartTrialResponse {
        message: "Free trial started successfully!".to_string(),
        trial_end_date: result.trial_end_date.as_datetime().to_rfc3339(),
        features: entitlements.features,
    }))
}

/// POST /api/subscriptions/subscribe
pub async fn subscribe(
    State(state): State<SubscriptionAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let plan = Plan::from_str(&request.plan)
        .ok()
        .filter(Plan::is_paid)
        .ok_or_else(|| SubscriptionError::invalid_plan(request.plan.clone()))?;

    let now = Timestamp::now();
    let is_admin = state.admins.is_admin(&user);
    let result = state
        .subscribe_handler()
        .handle(SubscribeCommand {
            user_id: user.id,
            plan,
            now,
        })
        .await?;

    let entitlements = evaluate(Some(&result.subscription), is_admin, now);
    Ok(Json(SubscribeResponse {
        message: "Subscription activated successfully!".to_string(),
        plan: result.subscription.plan,
        status: result.subscription.status,
        end_date: result.period_end.as_datetime().to_rfc3339(),
        premium_badge: result.subscription.premium_badge,
        badge_granted: result.badge_granted,
        features: entitlements.features,
    }))
}

/// POST /api/subscriptions/cancel
pub async fn cancel(
    State(state): State<SubscriptionAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let result = state
        .cancel_handler()
        .handle(CancelSubscriptionCommand {
            user_id: user.id,
            now: Timestamp::now(),
        })
        .await?;

    Ok(Json(CancelResponse {
        message: "Subscription cancelled. You will have access until the end of your current billing period.".to_string(),
        access_until: result.effective_at.as_datetime().to_rfc3339(),
    }))
}

/// POST /api/subscriptions/usage/:resource
pub async fn record_usage(
    State(state): State<SubscriptionAppState>,
    RequireAuth(user): RequireAuth,
    Path(resource): Path<String>,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let result = state
        .record_usage_handler()
        .handle(RecordUsageCommand {
            user,
            resource,
            now: Timestamp::now(),
        })
        .await?;

    let unlimited = result.limit.max == Limit::Unbounded;
    Ok(Json(RecordUsageResponse {
        limit: UsageLimitResponse::new(result.resource.as_str(), result.limit, unlimited),
        recorded: result.recorded,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct SubscriptionApiError(pub SubscriptionError);

impl From<SubscriptionError> for SubscriptionApiError {
    fn from(err: SubscriptionError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for SubscriptionApiError {
    fn from(err: DomainError) -> Self {
        Self(SubscriptionError::from(err))
    }
}

impl IntoResponse for SubscriptionApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            SubscriptionError::NotFoundForUser(_) => {
                (StatusCode::NOT_FOUND, "SUBSCRIPTION_NOT_FOUND")
            }
            SubscriptionError::AlreadyExists(_) => (StatusCode::CONFLICT, "SUBSCRIPTION_EXISTS"),
            SubscriptionError::PrerequisiteNotMet { .. } => {
                (StatusCode::FORBIDDEN, "PREREQUISITE_NOT_MET")
            }
            SubscriptionError::AlreadyEntitled { .. } => (StatusCode::CONFLICT, "ALREADY_ENTITLED"),
            SubscriptionError::AccessDenied(DenyReason::Unauthenticated) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED")
            }
            SubscriptionError::AccessDenied(_) => (StatusCode::FORBIDDEN, "ACCESS_DENIED"),
            SubscriptionError::LimitReached { .. } => {
                (StatusCode::FORBIDDEN, "USAGE_LIMIT_REACHED")
            }
            SubscriptionError::UnknownResource(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_RESOURCE"),
            SubscriptionError::InvalidPlan(_) => (StatusCode::BAD_REQUEST, "INVALID_PLAN"),
            SubscriptionError::InvalidState { .. } => (StatusCode::BAD_REQUEST, "INVALID_STATE"),
            SubscriptionError::ValidationFailed { .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_FAILED")
            }
            SubscriptionError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let mut body = match &self.0 {
            SubscriptionError::Infrastructure(msg) => {
                tracing::error!(error = %msg, "subscription request failed");
                ErrorResponse::new(error_code, "Internal server error")
            }
            other => ErrorResponse::new(error_code, other.message()),
        };

        if self.0.upgrade_required() {
            body = body.with_detail("upgradeRequired", true);
        }
        match &self.0 {
            SubscriptionError::LimitReached {
                resource,
                current,
                max,
            } => {
                body = body
                    .with_detail("limitType", resource.as_str())
                    .with_detail("current", *current)
                    .with_detail("limit", *max);
            }
            SubscriptionError::AccessDenied(DenyReason::FeatureLocked(feature)) => {
                body = body.with_detail("feature", feature.as_str());
            }
            SubscriptionError::PrerequisiteNotMet { missing } => {
                body = body.with_detail("missing", missing.clone());
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::{Feature, LimitedResource, Role};
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: SubscriptionError) -> (StatusCode, Value) {
        let response = SubscriptionApiError(err).into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn share_count_defaults_only_for_empty_body() {
        assert_eq!(share_count(b"").unwrap(), 1);
        assert_eq!(share_count(b"  \n").unwrap(), 1);
        assert_eq!(share_count(b"{}").unwrap(), 1);
        assert_eq!(share_count(br#"{"count":6}"#).unwrap(), 6);
    }

    #[test]
    fn malformed_share_body_is_rejected() {
        for body in [&br#"{"count":"10"}"#[..], br#"{"count":-3}"#, b"not json", br#"{"count":"#] {
            let err = share_count(body).unwrap_err();
            assert!(
                matches!(err, SubscriptionError::ValidationFailed { ref field, .. } if field == "count"),
                "{err:?}"
            );
        }
    }

    #[tokio::test]
    async fn prerequisite_not_met_is_403_with_missing_tasks() {
        let (status, body) = render(SubscriptionError::prerequisite_not_met(vec![
            "watch-ad".to_string(),
        ]))
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PREREQUISITE_NOT_MET");
        assert_eq!(body["missing"][0], "watch-ad");
    }

    #[tokio::test]
    async fn already_entitled_is_409() {
        let (status, body) = render(SubscriptionError::already_entitled("Trial already used")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "ALREADY_ENTITLED");
        assert_eq!(body["error"], "Trial already used");
    }

    #[tokio::test]
    async fn limit_reached_carries_limit_fields() {
        let (status, body) =
            render(SubscriptionError::limit_reached(LimitedResource::ActiveEvents, 2, 2)).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "USAGE_LIMIT_REACHED");
        assert_eq!(body["upgradeRequired"], true);
        assert_eq!(body["limitType"], "activeEvents");
        assert_eq!(body["current"], 2);
        assert_eq!(body["limit"], 2);
    }

    #[tokio::test]
    async fn upgrade_denial_is_403_access_denied() {
        let (status, body) = render(SubscriptionError::access_denied(
            DenyReason::UpgradeRequired { role: Role::Free },
        ))
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ACCESS_DENIED");
        assert_eq!(body["upgradeRequired"], true);
    }

    #[tokio::test]
    async fn feature_denial_names_the_feature() {
        let (_, body) = render(SubscriptionError::access_denied(DenyReason::FeatureLocked(
            Feature::AiInsights,
        )))
        .await;
        assert_eq!(body["feature"], "aiInsights");
    }

    #[tokio::test]
    async fn unauthenticated_denial_is_401() {
        let (status, body) =
            render(SubscriptionError::access_denied(DenyReason::Unauthenticated)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");
        assert!(body.get("upgradeRequired").is_none());
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let (status, body) =
            render(SubscriptionError::not_found_for_user(UserId::new("u-404").unwrap())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "SUBSCRIPTION_NOT_FOUND");
    }

    #[tokio::test]
    async fn invalid_state_is_400() {
        let (status, body) =
            render(SubscriptionError::invalid_state("on the free plan", "cancel")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_STATE");
    }

    #[tokio::test]
    async fn infrastructure_error_hides_details() {
        let (status, body) =
            render(SubscriptionError::infrastructure("connection reset by peer")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn domain_error_converts_through_subscription_error() {
        let err = DomainError::database("pool timed out");
        let (status, _) = render(SubscriptionApiError::from(err).0).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
