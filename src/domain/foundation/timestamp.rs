//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
///
/// Domain operations take `now` as an argument instead of reading the clock,
/// so every time-driven rule can be tested at an exact instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Adds whole days. Negative values subtract.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Adds calendar months, clamping to the last day of shorter months
    /// (Jan 31 + 1 month = Feb 28/29).
    pub fn add_months(&self, months: u32) -> Self {
        self.0
            .checked_add_months(Months::new(months))
            .map(Self)
            .unwrap_or_else(|| self.add_days(i64::from(months) * 30))
    }

    pub fn add_years(&self, years: u32) -> Self {
        self.add_months(years.saturating_mul(12))
    }

    /// True when both instants fall on the same UTC calendar day.
    pub fn same_utc_day(&self, other: &Timestamp) -> bool {
        self.0.date_naive() == other.0.date_naive()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
    }

    #[test]
    fn now_is_between_surrounding_clock_reads() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn is_before_is_strict() {
        let earlier = at(2024, 3, 1, 9);
        let later = at(2024, 3, 1, 10);

        assert!(earlier.is_before(&later));
        assert!(!later.is_before(&earlier));
        assert!(!earlier.is_before(&earlier));
    }

    #[test]
    fn add_days_moves_exact_multiples_of_24h() {
        let start = at(2024, 1, 15, 12);
        assert_eq!(start.add_days(7), at(2024, 1, 22, 12));
        assert_eq!(start.add_days(-1), at(2024, 1, 14, 12));
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        let jan_31 = at(2024, 1, 31, 8);
        let feb = jan_31.add_months(1);
        assert_eq!(feb.as_datetime().month(), 2);
        assert_eq!(feb.as_datetime().day(), 29);
    }

    #[test]
    fn add_years_lands_on_same_calendar_date() {
        let start = at(2023, 6, 10, 0);
        assert_eq!(start.add_years(1), at(2024, 6, 10, 0));
    }

    #[test]
    fn same_utc_day_ignores_time_of_day() {
        assert!(at(2024, 5, 5, 0).same_utc_day(&at(2024, 5, 5, 23)));
        assert!(!at(2024, 5, 5, 23).same_utc_day(&at(2024, 5, 6, 0)));
    }

    #[test]
    fn serializes_as_rfc3339_string() {
        let json = serde_json::to_string(&at(2024, 1, 15, 10)).unwrap();
        assert!(json.contains("2024-01-15T10:00:00"));

        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, at(2024, 1, 15, 10));
    }
}
