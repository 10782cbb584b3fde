//! Time ranges and clocks.
//!
//! Every instant in the booking core is an offset-aware
//! [`OffsetDateTime`]. Ranges are half-open: `[start, end)`.

use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Error produced when a range would violate `start < end`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Start time must be before end time (start: {start}, end: {end})")]
pub struct TimeRangeError {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

/// A half-open interval of time with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange", into = "RawTimeRange")]
pub struct TimeRange {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

#[derive(Serialize, Deserialize)]
struct RawTimeRange {
    #[serde(with = "time::serde::rfc3339")]
    start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    end: OffsetDateTime,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = TimeRangeError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        TimeRange::new(raw.start, raw.end)
    }
}

impl From<TimeRange> for RawTimeRange {
    fn from(range: TimeRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

impl TimeRange {
    /// Creates a range, rejecting empty and inverted intervals.
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self, TimeRangeError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(TimeRangeError { start, end })
        }
    }

    /// Creates a range from a start instant and a positive length.
    pub fn starting_at(start: OffsetDateTime, length: Duration) -> Result<Self, TimeRangeError> {
        Self::new(start, start + length)
    }

    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Strict overlap: ranges that only touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// `true` when `other` lies entirely within this range.
    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// The UTC calendar day containing `start`, as `[00:00, next 00:00)`.
    pub fn utc_day_of(instant: OffsetDateTime) -> TimeRange {
        let day_start = instant
            .to_offset(time::UtcOffset::UTC)
            .replace_time(time::Time::MIDNIGHT);
        TimeRange {
            start: day_start,
            end: day_start + Duration::days(1),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt = &time::format_description::well_known::Rfc3339;
        let start = self.start.format(fmt).map_err(|_| fmt::Error)?;
        let end = self.end.format(fmt).map_err(|_| fmt::Error)?;
        write!(f, "[{start}, {end})")
    }
}

/// Source of "now" for anything time-dependent.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock pinned to an instant, movable by hand.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<OffsetDateTime>,
}

impl FixedClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        let mut guard = self.now.write().unwrap_or_else(|p| p.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|p| p.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.read().unwrap_or_else(|p| p.into_inner())
    }
}
