//! Route guard: allow/deny decisions over evaluated entitlements.
//!
//! The guard never reads a subscription directly. It consumes the evaluator
//! output, so pages, API middleware and tests all share one decision table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{Entitlements, Feature};

/// Path a denied page navigation is sent to when the caller is not signed in.
pub const LOGIN_PATH: &str = "/login";

/// Path a denied page navigation is sent to when an upgrade is needed.
pub const UPGRADE_PATH: &str = "/premium";

/// Role derived from entitlements. Admin outranks premium outranks free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Free,
    Premium,
    Admin,
}

impl Role {
    pub fn derive(is_admin: bool, is_premium: bool) -> Self {
        if is_admin {
            Role::Admin
        } else if is_premium {
            Role::Premium
        } else {
            Role::Free
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Free => "free",
            Role::Premium => "premium",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a guard refused access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    /// Caller's role is outside the required set.
    UpgradeRequired { role: Role },
    /// Caller lacks one specific feature.
    FeatureLocked(Feature),
}

impl DenyReason {
    pub fn message(&self) -> String {
        match self {
            DenyReason::Unauthenticated => "Authentication required".to_string(),
            DenyReason::UpgradeRequired { .. } => {
                "Premium subscription required to access this feature".to_string()
            }
            DenyReason::FeatureLocked(feature) => {
                format!("The {} feature requires a premium subscription", feature)
            }
        }
    }
}

/// Everything the guard may be asked to decide on.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardInput {
    /// Auth or subscription state is still loading.
    Pending,
    Anonymous,
    Ready(Entitlements),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Not yet decidable. Never treated as a denial.
    Pending,
    Deny(DenyReason),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }

    /// Redirect path for a page navigation, if any.
    pub fn navigation_target(&self) -> Option<&'static str> {
        match self {
            GuardDecision::Allow | GuardDecision::Pending => None,
            GuardDecision::Deny(DenyReason::Unauthenticated) => Some(LOGIN_PATH),
            GuardDecision::Deny(_) => Some(UPGRADE_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    AnyRole(BTreeSet<Role>),
    Feature(Feature),
}

/// A reusable access rule for a page or operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    requirement: Requirement,
}

impl RouteGuard {
    /// Allows callers whose role is in `required`.
    pub fn new(required: impl IntoIterator<Item = Role>) -> Self {
        Self {
            requirement: Requirement::AnyRole(required.into_iter().collect()),
        }
    }

    /// Allows callers that have `feature` enabled.
    pub fn require_feature(feature: Feature) -> Self {
        Self {
            requirement: Requirement::Feature(feature),
        }
    }

    pub fn decide(&self, input: &GuardInput) -> GuardDecision {
        let entitlements = match input {
            GuardInput::Pending => return GuardDecision::Pending,
            GuardInput::Anonymous => return GuardDecision::Deny(DenyReason::Unauthenticated),
            GuardInput::Ready(entitlements) => entitlements,
        };

        match &self.requirement {
            Requirement::AnyRole(roles) if roles.contains(&entitlements.role) => {
                GuardDecision::Allow
            }
            Requirement::AnyRole(_) => GuardDecision::Deny(DenyReason::UpgradeRequired {
                role: entitlements.role,
            }),
            Requirement::Feature(feature) if entitlements.has_feature(*feature) => {
                GuardDecision::Allow
            }
            Requirement::Feature(feature) => {
                GuardDecision::Deny(DenyReason::FeatureLocked(*feature))
            }
        }
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new([Role::Premium, Role::Admin])
    }
}
