//! Closed set of gated product features.
//!
//! Wire names match the camelCase keys the web client already uses, so
//! `Feature::AiInsights` travels as `"aiInsights"`. Parsing an unknown name
//! is an error: a typo can never silently grant or deny access.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    // Free tier
    #[serde(rename = "basicEvents")]
    BasicEvents,
    #[serde(rename = "basicTasks")]
    BasicTasks,
    #[serde(rename = "basicMood")]
    BasicMood,
    #[serde(rename = "communitySupport")]
    CommunitySupport,

    // Premium
    #[serde(rename = "unlimitedEvents")]
    UnlimitedEvents,
    #[serde(rename = "advancedBudgetTracking")]
    AdvancedBudgetTracking,
    #[serde(rename = "fullMoodHistory")]
    FullMoodHistory,
    #[serde(rename = "customChecklists")]
    CustomChecklists,
    #[serde(rename = "premiumMotivationalMessages")]
    PremiumMotivationalMessages,
    #[serde(rename = "profileInsights")]
    ProfileInsights,
    #[serde(rename = "fullCalendarSync")]
    FullCalendarSync,
    #[serde(rename = "adFree")]
    AdFree,
    #[serde(rename = "exportablePDFs")]
    ExportablePdfs,
    #[serde(rename = "aiInsights")]
    AiInsights,
    #[serde(rename = "prioritySupport")]
    PrioritySupport,
    #[serde(rename = "advancedAnalytics")]
    AdvancedAnalytics,
}

impl Feature {
    pub const ALL: [Feature; 16] = [
        Feature::BasicEvents,
        Feature::BasicTasks,
        Feature::BasicMood,
        Feature::CommunitySupport,
        Feature::UnlimitedEvents,
        Feature::AdvancedBudgetTracking,
        Feature::FullMoodHistory,
        Feature::CustomChecklists,
        Feature::PremiumMotivationalMessages,
        Feature::ProfileInsights,
        Feature::FullCalendarSync,
        Feature::AdFree,
        Feature::ExportablePdfs,
        Feature::AiInsights,
        Feature::PrioritySupport,
        Feature::AdvancedAnalytics,
    ];

    /// Features available to every user regardless of plan.
    pub const FREE: [Feature; 4] = [
        Feature::BasicEvents,
        Feature::BasicTasks,
        Feature::BasicMood,
        Feature::CommunitySupport,
    ];

    pub fn is_free(&self) -> bool {
        Self::FREE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::BasicEvents => "basicEvents",
            Feature::BasicTasks => "basicTasks",
            Feature::BasicMood => "basicMood",
            Feature::CommunitySupport => "communitySupport",
            Feature::UnlimitedEvents => "unlimitedEvents",
            Feature::AdvancedBudgetTracking => "advancedBudgetTracking",
            Feature::FullMoodHistory => "fullMoodHistory",
            Feature::CustomChecklists => "customChecklists",
            Feature::PremiumMotivationalMessages => "premiumMotivationalMessages",
            Feature::ProfileInsights => "profileInsights",
            Feature::FullCalendarSync => "fullCalendarSync",
            Feature::AdFree => "adFree",
            Feature::ExportablePdfs => "exportablePDFs",
            Feature::AiInsights => "aiInsights",
            Feature::PrioritySupport => "prioritySupport",
            Feature::AdvancedAnalytics => "advancedAnalytics",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Feature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("feature", format!("unknown feature '{}'", s))
            })
    }
}
