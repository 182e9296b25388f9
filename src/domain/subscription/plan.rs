//! Subscription plan definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, ValidationError};

/// Billing plan attached to a subscription.
///
/// `Free` is the default for every new account. A running trial does not
/// change the plan; only the status moves to `Trial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Monthly,
    Yearly,
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Free, Plan::Monthly, Plan::Yearly];

    /// Returns true for monthly and yearly plans.
    pub fn is_paid(&self) -> bool {
        !matches!(self, Plan::Free)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Monthly => "monthly",
            Plan::Yearly => "yearly",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Free => "Free",
            Plan::Monthly => "Monthly",
            Plan::Yearly => "Yearly",
        }
    }

    /// List price in US cents.
    pub fn price_cents(&self) -> u32 {
        match self {
            Plan::Free => 0,
            Plan::Monthly => 999,
            Plan::Yearly => 9999,
        }
    }

    /// End of a billing period that starts at `start`. `None` for the free plan.
    pub fn period_end(&self, start: Timestamp) -> Option<Timestamp> {
        match self {
            Plan::Free => None,
            Plan::Monthly => Some(start.add_months(1)),
            Plan::Yearly => Some(start.add_years(1)),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Plan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "monthly" => Ok(Plan::Monthly),
            "yearly" => Ok(Plan::Yearly),
            other => Err(ValidationError::invalid_format(
                "plan",
                format!("unknown plan '{}'", other),
            )),
        }
    }
}
