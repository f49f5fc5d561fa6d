//! Report windows.
//!
//! A window is the half-open interval `[start, end)` a report summarizes. It is
//! derived from the report kind and a reference instant, which is first
//! truncated to its UTC midnight so that runs at the kind's cadence produce
//! windows that only touch at their boundaries.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::report::ReportKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Window covered by a `kind` report generated at `reference`.
    ///
    /// - daily: the previous UTC day
    /// - weekly: the seven days before the reference day
    /// - monthly: the previous calendar month
    pub fn for_kind(kind: ReportKind, reference: DateTime<Utc>) -> Self {
        let midnight = start_of_day(reference);
        match kind {
            ReportKind::Daily => Self {
                start: midnight - Duration::days(1),
                end: midnight,
            },
            ReportKind::Weekly => Self {
                start: midnight - Duration::days(7),
                end: midnight,
            },
            ReportKind::Monthly => {
                let end = start_of_month(midnight);
                let start = start_of_month(end - Duration::days(1));
                Self { start, end }
            }
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True when the two windows share more than a boundary instant.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

fn start_of_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn start_of_month(midnight: DateTime<Utc>) -> DateTime<Utc> {
    midnight - Duration::days(i64::from(midnight.day0()))
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
