/// Free-time search
///
/// Walks a day's entries in start order and reports where a block of the
/// requested length fits inside a preferred window. Only the earliest
/// placement per gap is reported.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::conflict::Scheduled;
use crate::domain::DomainError;

/// Time-of-day window a search is confined to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "crate::domain::time_utils::hhmm")]
    pub start: NaiveTime,
    #[serde(with = "crate::domain::time_utils::hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, DomainError> {
        if end <= start {
            return Err(DomainError::Validation {
                message: format!("window end {} must be after start {}", end, start),
            });
        }
        Ok(Self { start, end })
    }

    fn on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        (date.and_time(self.start), date.and_time(self.end))
    }
}

impl Default for TimeWindow {
    /// 09:00 - 22:00
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// A candidate placement of exactly the requested length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Length of the whole gap the candidate sits in
    pub available_minutes: i64,
}

impl FreeSlot {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Find candidate windows of `duration` on `date` inside `window`
///
/// `entries` are the entries already placed that day, in any order.
pub fn find_free_slots<T: Scheduled>(
    date: NaiveDate,
    entries: &[T],
    duration: Duration,
    window: TimeWindow,
) -> Result<Vec<FreeSlot>, DomainError> {
    if duration <= Duration::zero() {
        return Err(DomainError::Validation {
            message: "Requested duration must be positive".to_string(),
        });
    }
    if window.end <= window.start {
        return Err(DomainError::Validation {
            message: format!("window end {} must be after start {}", window.end, window.start),
        });
    }

    let (prefer_start, prefer_end) = window.on(date);
    let mut spans: Vec<(NaiveDateTime, NaiveDateTime)> = entries.iter().map(|e| e.span()).collect();
    spans.sort_by_key(|(start, _)| *start);

    let mut candidates = Vec::new();
    let mut cursor = prefer_start;

    for (start, end) in spans {
        if cursor >= prefer_end {
            break;
        }
        if start > cursor {
            // Gaps are clamped to the window so no candidate runs past prefer_end
            let gap_end = start.min(prefer_end);
            let available = gap_end - cursor;
            if available >= duration {
                candidates.push(FreeSlot {
                    start: cursor,
                    end: cursor + duration,
                    available_minutes: available.num_minutes(),
                });
            }
        }
        cursor = cursor.max(end);
    }

    if prefer_end - cursor >= duration {
        candidates.push(FreeSlot {
            start: cursor,
            end: cursor + duration,
            available_minutes: (prefer_end - cursor).num_minutes(),
        });
    }

    Ok(candidates)
}

/// Maximal unoccupied intervals between `bounds_start` and `bounds_end`
pub fn free_periods(
    spans: impl IntoIterator<Item = (NaiveDateTime, NaiveDateTime)>,
    bounds_start: NaiveDateTime,
    bounds_end: NaiveDateTime,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut spans: Vec<_> = spans.into_iter().collect();
    spans.sort_by_key(|(start, _)| *start);

    let mut periods = Vec::new();
    let mut cursor = bounds_start;

    for (start, end) in spans {
        if cursor >= bounds_end {
            break;
        }
        let gap_end = start.min(bounds_end);
        if gap_end > cursor {
            periods.push((cursor, gap_end));
        }
        cursor = cursor.max(end);
    }

    if bounds_end > cursor {
        periods.push((cursor, bounds_end));
    }

    periods
}
