//! Ranking weeks. Week `n` of a season starts at `epoch + (n - 1) * 7 days`,
//! midnight UTC. `end` is reported as one millisecond before the next week
//! starts, but membership runs right up to the next start so weeks never gap.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonCalendar {
    epoch: NaiveDate,
    total_weeks: u32,
}

impl SeasonCalendar {
    #[must_use]
    pub const fn new(epoch: NaiveDate, total_weeks: u32) -> Self {
        Self { epoch, total_weeks }
    }

    #[must_use]
    pub const fn total_weeks(&self) -> u32 {
        self.total_weeks
    }

    /// Bounds of `week`, or `None` when the week is outside `1..=total_weeks`.
    #[must_use]
    pub fn window(&self, week: u32) -> Option<WeekWindow> {
        if week == 0 || week > self.total_weeks {
            return None;
        }

        let start = self.epoch.and_hms_opt(0, 0, 0)?.and_utc()
            + Duration::days(7 * i64::from(week - 1));
        let end = start + Duration::days(7) - Duration::milliseconds(1);

        Some(WeekWindow { week, start, end })
    }

    /// Week number an instant falls in. Instants before the season map to week 1
    /// and instants after it to the last week.
    #[must_use]
    pub fn week_containing(&self, at: DateTime<Utc>) -> u32 {
        let days = (at.date_naive() - self.epoch).num_days();
        if days < 0 {
            return 1;
        }

        let week = u32::try_from(days / 7 + 1).unwrap_or(u32::MAX);
        week.min(self.total_weeks.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
    pub week: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekWindow {
    /// Inclusive of `start` and `end`, and of the sub-millisecond tail after
    /// `end` that precedes the next week's start.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end + Duration::milliseconds(1)
    }
}

/// Parses the air timestamp formats the remote API emits: RFC 3339, a bare
/// calendar date (taken as UTC midnight), or a naive date-time (taken as UTC).
#[must_use]
pub fn parse_air_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
}
