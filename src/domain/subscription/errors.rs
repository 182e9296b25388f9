//! Subscription-specific error types.
//!
//! Every variant is recoverable and user-facing.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFoundForUser | 404 |
//! | AlreadyExists | 409 |
//! | PrerequisiteNotMet | 403 |
//! | AlreadyEntitled | 409 |
//! | AccessDenied | 401 / 403 |
//! | LimitReached | 403 |
//! | UnknownResource | 400 |
//! | InvalidPlan | 400 |
//! | InvalidState | 400 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, UserId, ValidationError};

use super::{DenyReason, LimitedResource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// No subscription exists for this user.
    NotFoundForUser(UserId),

    /// User already has a subscription record.
    AlreadyExists(UserId),

    /// Trial start attempted before every prerequisite task was done.
    PrerequisiteNotMet { missing: Vec<String> },

    /// The caller already holds the entitlement they are asking for.
    AlreadyEntitled { reason: String },

    /// A route or feature gate rejected the caller.
    AccessDenied(DenyReason),

    /// Recording usage would exceed the free-tier ceiling.
    LimitReached {
        resource: LimitedResource,
        current: u32,
        max: u32,
    },

    /// Usage was recorded against a resource name that is not tracked.
    UnknownResource(String),

    InvalidPlan(String),

    InvalidState { current: String, attempted: String },

    ValidationFailed { field: String, message: String },

    Infrastructure(String),
}

impl SubscriptionError {
    pub fn not_found_for_user(user_id: UserId) -> Self {
        SubscriptionError::NotFoundForUser(user_id)
    }

    pub fn already_exists(user_id: UserId) -> Self {
        SubscriptionError::AlreadyExists(user_id)
    }

    pub fn prerequisite_not_met(missing: Vec<String>) -> Self {
        SubscriptionError::PrerequisiteNotMet { missing }
    }

    pub fn already_entitled(reason: impl Into<String>) -> Self {
        SubscriptionError::AlreadyEntitled {
            reason: reason.into(),
        }
    }

    pub fn access_denied(reason: DenyReason) -> Self {
        SubscriptionError::AccessDenied(reason)
    }

    pub fn limit_reached(resource: LimitedResource, current: u32, max: u32) -> Self {
        SubscriptionError::LimitReached {
            resource,
            current,
            max,
        }
    }

    pub fn unknown_resource(name: impl Into<String>) -> Self {
        SubscriptionError::UnknownResource(name.into())
    }

    pub fn invalid_plan(plan: impl Into<String>) -> Self {
        SubscriptionError::InvalidPlan(plan.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        SubscriptionError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SubscriptionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SubscriptionError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::NotFoundForUser(_) => ErrorCode::SubscriptionNotFound,
            SubscriptionError::AlreadyExists(_) => ErrorCode::SubscriptionExists,
            SubscriptionError::PrerequisiteNotMet { .. } => ErrorCode::PrerequisiteNotMet,
            SubscriptionError::AlreadyEntitled { .. } => ErrorCode::AlreadyEntitled,
            SubscriptionError::AccessDenied(DenyReason::Unauthenticated) => {
                ErrorCode::Unauthorized
            }
            SubscriptionError::AccessDenied(_) => ErrorCode::AccessDenied,
            SubscriptionError::LimitReached { .. } => ErrorCode::UsageLimitReached,
            SubscriptionError::UnknownResource(_) => ErrorCode::UnknownResource,
            SubscriptionError::InvalidPlan(_) => ErrorCode::InvalidPlan,
            SubscriptionError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            SubscriptionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            SubscriptionError::NotFoundForUser(user_id) => {
                format!("No subscription found for user: {}", user_id)
            }
            SubscriptionError::AlreadyExists(user_id) => {
                format!("User {} already has a subscription", user_id)
            }
            SubscriptionError::PrerequisiteNotMet { missing } => format!(
                "Complete all trial tasks before starting your free trial. Remaining: {}",
                missing.join(", ")
            ),
            SubscriptionError::AlreadyEntitled { reason } => reason.clone(),
            SubscriptionError::AccessDenied(reason) => reason.message(),
            SubscriptionError::LimitReached {
                resource,
                current,
                max,
            } => format!(
                "You've reached the free limit for {} ({}/{}). Upgrade to premium for unlimited access.",
                resource, current, max
            ),
            SubscriptionError::UnknownResource(name) => format!("Unknown resource: {}", name),
            SubscriptionError::InvalidPlan(plan) => format!("Invalid plan: {}", plan),
            SubscriptionError::InvalidState { current, attempted } => {
                format!("Cannot {} while subscription is {}", attempted, current)
            }
            SubscriptionError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            SubscriptionError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// True for errors that prompt the client to show an upgrade surface.
    pub fn upgrade_required(&self) -> bool {
        matches!(
            self,
            SubscriptionError::LimitReached { .. }
                | SubscriptionError::AccessDenied(DenyReason::UpgradeRequired { .. })
                | SubscriptionError::AccessDenied(DenyReason::FeatureLocked(_))
        )
    }
}

impl std::fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SubscriptionError {}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => SubscriptionError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::InvalidPlan => SubscriptionError::InvalidPlan(err.message),
            ErrorCode::InvalidStateTransition => SubscriptionError::InvalidState {
                current: "unknown".to_string(),
                attempted: err.message,
            },
            _ => SubscriptionError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        SubscriptionError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<SubscriptionError> for DomainError {
    fn from(err: SubscriptionError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
