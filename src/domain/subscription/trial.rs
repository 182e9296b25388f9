//! Trial prerequisites and the trial-gate phase machine.
//!
//! A free user earns a premium trial by watching an ad, following the
//! Instagram account and sharing a referral link enough times. Each task is
//! an independent, idempotent set-operation, so concurrent completions can be
//! merged without losing progress.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Shares needed to unlock a trial unless overridden by configuration.
pub const REQUIRED_SHARES: u32 = 10;

/// Length of a trial in days unless overridden by configuration.
pub const TRIAL_DAYS: u32 = 7;

/// Tunable trial rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialPolicy {
    pub trial_days: u32,
    pub required_shares: u32,
}

impl Default for TrialPolicy {
    fn default() -> Self {
        Self {
            trial_days: TRIAL_DAYS,
            required_shares: REQUIRED_SHARES,
        }
    }
}

/// A single prerequisite completion reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "kebab-case")]
pub enum TrialTask {
    WatchAd,
    FollowInstagram,
    /// Adds `count` shares to the running total.
    Share { count: u32 },
}

impl TrialTask {
    pub fn name(&self) -> &'static str {
        match self {
            TrialTask::WatchAd => "watch-ad",
            TrialTask::FollowInstagram => "follow-instagram",
            TrialTask::Share { .. } => "share",
        }
    }
}

impl fmt::Display for TrialTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialTask::Share { count } => write!(f, "share x{}", count),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Progress towards the trial prerequisites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialTasks {
    pub watched_ad: bool,
    pub followed_instagram: bool,
    pub shares: u32,
}

impl TrialTasks {
    /// Applies a task. Returns true if progress changed.
    pub fn complete(&mut self, task: TrialTask) -> bool {
        let before = *self;
        match task {
            TrialTask::WatchAd => self.watched_ad = true,
            TrialTask::FollowInstagram => self.followed_instagram = true,
            TrialTask::Share { count } => self.shares = self.shares.saturating_add(count),
        }
        before != *self
    }

    pub fn any_started(&self) -> bool {
        self.watched_ad || self.followed_instagram || self.shares > 0
    }

    pub fn is_complete(&self, policy: &TrialPolicy) -> bool {
        self.missing(policy).is_empty()
    }

    /// Human-readable list of unmet prerequisites.
    pub fn missing(&self, policy: &TrialPolicy) -> Vec<String> {
        let mut missing = Vec::new();
        if !self.watched_ad {
            missing.push("watch-ad".to_string());
        }
        if !self.followed_instagram {
            missing.push("follow-instagram".to_string());
        }
        if self.shares < policy.required_shares {
            missing.push(format!("share ({}/{})", self.shares, policy.required_shares));
        }
        missing
    }
}

/// Where a subscription sits in the trial-gate flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialPhase {
    NoTrialRequested,
    TasksIncomplete,
    TasksComplete,
    TrialActive,
    TrialExpired,
}

impl StateMachine for TrialPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TrialPhase::*;
        matches!(
            (self, target),
            (NoTrialRequested, TasksIncomplete)
                | (NoTrialRequested, TasksComplete) // all tasks in one burst
                | (TasksIncomplete, TasksIncomplete)
                | (TasksIncomplete, TasksComplete)
                | (TasksComplete, TrialActive)
                | (TrialActive, TrialExpired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TrialPhase::*;
        match self {
            NoTrialRequested => vec![TasksIncomplete, TasksComplete],
            TasksIncomplete => vec![TasksIncomplete, TasksComplete],
            TasksComplete => vec![TrialActive],
            TrialActive => vec![TrialExpired],
            TrialExpired => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_are_idempotent() {
        let mut tasks = TrialTasks::default();
        assert!(tasks.complete(TrialTask::WatchAd));
        assert!(!tasks.complete(TrialTask::WatchAd));
        assert!(tasks.watched_ad);
    }

    #[test]
    fn shares_accumulate() {
        let mut tasks = TrialTasks::default();
        tasks.complete(TrialTask::Share { count: 4 });
        tasks.complete(TrialTask::Share { count: 6 });
        assert_eq!(tasks.shares, 10);
        assert!(!tasks.complete(TrialTask::Share { count: 0 }));
    }

    #[test]
    fn shares_saturate_instead_of_wrapping() {
        let mut tasks = TrialTasks {
            shares: u32::MAX - 1,
            ..Default::default()
        };
        tasks.complete(TrialTask::Share { count: 5 });
        assert_eq!(tasks.shares, u32::MAX);
    }

    #[test]
    fn complete_requires_all_three() {
        let policy = TrialPolicy::default();
        let mut tasks = TrialTasks::default();
        tasks.complete(TrialTask::WatchAd);
        tasks.complete(TrialTask::FollowInstagram);
        tasks.complete(TrialTask::Share { count: 9 });
        assert!(!tasks.is_complete(&policy));
        assert_eq!(tasks.missing(&policy), vec!["share (9/10)".to_string()]);

        tasks.complete(TrialTask::Share { count: 1 });
        assert!(tasks.is_complete(&policy));
    }

    #[test]
    fn policy_can_lower_share_target() {
        let policy = TrialPolicy {
            required_shares: 2,
            ..Default::default()
        };
        let tasks = TrialTasks {
            watched_ad: true,
            followed_instagram: true,
            shares: 2,
        };
        assert!(tasks.is_complete(&policy));
    }

    #[test]
    fn missing_lists_everything_for_fresh_progress() {
        let missing = TrialTasks::default().missing(&TrialPolicy::default());
        assert_eq!(missing.len(), 3);
        assert_eq!(missing[0], "watch-ad");
    }

    #[test]
    fn task_serializes_with_kebab_tag() {
        let json = serde_json::to_value(TrialTask::Share { count: 3 }).unwrap();
        assert_eq!(json["task"], "share");
        assert_eq!(json["count"], 3);

        let parsed: TrialTask = serde_json::from_str(r#"{"task":"follow-instagram"}"#).unwrap();
        assert_eq!(parsed, TrialTask::FollowInstagram);
    }

    #[test]
    fn phase_machine_is_linear_after_completion() {
        assert!(TrialPhase::TasksComplete.can_transition_to(&TrialPhase::TrialActive));
        assert!(!TrialPhase::TasksIncomplete.can_transition_to(&TrialPhase::TrialActive));
        assert!(TrialPhase::TrialExpired.is_terminal());
    }
}
