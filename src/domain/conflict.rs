/// Conflict detection between time-bounded entries
///
/// Two entries conflict when their intervals overlap and they are not both
/// allowed to run in parallel. The same rule applies to fine-grained time
/// slots and to the coarser day tasks, so both implement `Scheduled`.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::domain::time_utils::overlaps;

/// Anything that occupies a half-open interval of time
pub trait Scheduled {
    /// Start and end instants of the entry
    fn span(&self) -> (NaiveDateTime, NaiveDateTime);

    /// Whether this entry tolerates running alongside another one
    fn allows_parallel(&self) -> bool;

    /// Overlapping intervals conflict unless both sides are parallel-capable
    fn conflicts_with<O: Scheduled + ?Sized>(&self, other: &O) -> bool {
        let (a_start, a_end) = self.span();
        let (b_start, b_end) = other.span();

        if !overlaps(a_start, a_end, b_start, b_end) {
            return false;
        }

        !(self.allows_parallel() && other.allows_parallel())
    }
}

/// All conflicting pairs within `entries`, in scan order
///
/// Full pairwise comparison; per-day lists are small.
pub fn detect_conflicts<T: Scheduled>(entries: &[T]) -> Vec<(&T, &T)> {
    let mut conflicts = Vec::new();
    for (i, first) in entries.iter().enumerate() {
        for second in &entries[i + 1..] {
            if first.conflicts_with(second) {
                conflicts.push((first, second));
            }
        }
    }
    conflicts
}

/// First entry in `existing` that `candidate` conflicts with
pub fn find_conflict<'a, T, C>(existing: &'a [T], candidate: &C) -> Option<&'a T>
where
    T: Scheduled,
    C: Scheduled + ?Sized,
{
    existing.iter().find(|entry| candidate.conflicts_with(*entry))
}

/// Why a container refused an entry
///
/// Rejection is an expected outcome for the planner, not a fault.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RejectReason {
    #[error("entry belongs to {found}, not {expected}")]
    WrongDate { expected: NaiveDate, found: NaiveDate },

    #[error("conflicts with '{with}'")]
    Conflict { with: String },

    #[error("no day at weekday index {0}")]
    NoSuchDay(usize),
}
