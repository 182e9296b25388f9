//! Entitlement rules configuration

use serde::Deserialize;

use crate::domain::subscription::{AdminAllowlist, TrialPolicy, REQUIRED_SHARES, TRIAL_DAYS};

use super::error::ValidationError;

const MAX_TRIAL_DAYS: u32 = 90;
const MAX_REQUIRED_SHARES: u32 = 100;

/// Admin allowlist and trial rules.
#[derive(Debug, Clone, Deserialize)]
pub struct EntitlementsConfig {
    /// Comma-separated admin emails
    #[serde(default)]
    pub admin_emails: String,

    #[serde(default = "default_trial_days")]
    pub trial_days: u32,

    /// Shares required before a trial can start
    #[serde(default = "default_required_shares")]
    pub required_shares: u32,
}

impl EntitlementsConfig {
    pub fn admin_allowlist(&self) -> AdminAllowlist {
        AdminAllowlist::from_csv(&self.admin_emails)
    }

    pub fn trial_policy(&self) -> TrialPolicy {
        TrialPolicy {
            trial_days: self.trial_days,
            required_shares: self.required_shares,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_TRIAL_DAYS).contains(&self.trial_days) {
            return Err(ValidationError::InvalidTrialDays(MAX_TRIAL_DAYS));
        }
        if !(1..=MAX_REQUIRED_SHARES).contains(&self.required_shares) {
            return Err(ValidationError::InvalidRequiredShares(MAX_REQUIRED_SHARES));
        }
        Ok(())
    }
}

impl Default for EntitlementsConfig {
    fn default() -> Self {
        Self {
            admin_emails: String::new(),
            trial_days: default_trial_days(),
            required_shares: default_required_shares(),
        }
    }
}

fn default_trial_days() -> u32 {
    TRIAL_DAYS
}

fn default_required_shares() -> u32 {
    REQUIRED_SHARES
}
