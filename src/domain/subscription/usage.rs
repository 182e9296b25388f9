//! Usage counters and per-resource ceilings for the free tier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, ValidationError};

/// A resource whose consumption is capped on the free tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LimitedResource {
    ActiveEvents,
    DailyTasks,
    MoodEntries,
    Templates,
}

impl LimitedResource {
    pub const ALL: [LimitedResource; 4] = [
        LimitedResource::ActiveEvents,
        LimitedResource::DailyTasks,
        LimitedResource::MoodEntries,
        LimitedResource::Templates,
    ];

    /// Free-tier ceiling for this resource.
    pub fn free_limit(&self) -> u32 {
        match self {
            LimitedResource::ActiveEvents => 2,
            LimitedResource::DailyTasks => 10,
            LimitedResource::MoodEntries => 7,
            LimitedResource::Templates => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitedResource::ActiveEvents => "activeEvents",
            LimitedResource::DailyTasks => "dailyTasks",
            LimitedResource::MoodEntries => "moodEntries",
            LimitedResource::Templates => "templates",
        }
    }

    /// Lenient lookup used by limit checks, where unknown names are not an error.
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.as_str() == name)
    }
}

impl fmt::Display for LimitedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LimitedResource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| {
            ValidationError::invalid_format("resource", format!("unknown resource '{}'", s))
        })
    }
}

/// Ceiling on a resource. Serializes as a number, or `null` when unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum Limit {
    Bounded(u32),
    Unbounded,
}

impl From<Option<u32>> for Limit {
    fn from(value: Option<u32>) -> Self {
        value.map(Limit::Bounded).unwrap_or(Limit::Unbounded)
    }
}

impl From<Limit> for Option<u32> {
    fn from(limit: Limit) -> Self {
        match limit {
            Limit::Bounded(max) => Some(max),
            Limit::Unbounded => None,
        }
    }
}

/// Result of comparing a counter against its ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLimit {
    pub current: u32,
    pub max: Limit,
    pub reached: bool,
}

impl UsageLimit {
    pub fn new(current: u32, max: Limit) -> Self {
        let reached = match max {
            Limit::Bounded(max) => current >= max,
            Limit::Unbounded => false,
        };
        Self {
            current,
            max,
            reached,
        }
    }

    /// Result for a resource with no ceiling at all.
    pub fn unlimited() -> Self {
        Self::new(0, Limit::Unbounded)
    }
}

/// Per-user consumption counters.
///
/// `daily_tasks` restarts at zero on the first write of each UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounters {
    pub active_events: u32,
    pub daily_tasks: u32,
    pub mood_entries: u32,
    pub templates: u32,
    pub last_daily_reset: Timestamp,
}

impl UsageCounters {
    pub fn new(now: Timestamp) -> Self {
        Self {
            active_events: 0,
            daily_tasks: 0,
            mood_entries: 0,
            templates: 0,
            last_daily_reset: now,
        }
    }

    pub fn get(&self, resource: LimitedResource) -> u32 {
        match resource {
            LimitedResource::ActiveEvents => self.active_events,
            LimitedResource::DailyTasks => self.daily_tasks,
            LimitedResource::MoodEntries => self.mood_entries,
            LimitedResource::Templates => self.templates,
        }
    }

    /// Counter value as seen at `now`, accounting for a pending daily reset.
    pub fn current(&self, resource: LimitedResource, now: Timestamp) -> u32 {
        if resource == LimitedResource::DailyTasks && !self.last_daily_reset.same_utc_day(&now) {
            0
        } else {
            self.get(resource)
        }
    }

    /// Zeroes `daily_tasks` if `now` is on a later UTC day than the last reset.
    pub fn reset_daily_if_new_day(&mut self, now: Timestamp) -> bool {
        if self.last_daily_reset.same_utc_day(&now) {
            return false;
        }
        self.daily_tasks = 0;
        self.last_daily_reset = now;
        true
    }

    /// Increments a counter and returns the new value.
    pub fn increment(&mut self, resource: LimitedResource, now: Timestamp) -> u32 {
        self.reset_daily_if_new_day(now);
        let slot = match resource {
            LimitedResource::ActiveEvents => &mut self.active_events,
            LimitedResource::DailyTasks => &mut self.daily_tasks,
            LimitedResource::MoodEntries => &mut self.mood_entries,
            LimitedResource::Templates => &mut self.templates,
        };
        *slot = slot.saturating_add(1);
        *slot
    }
}
