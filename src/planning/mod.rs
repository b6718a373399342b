/// Priority-driven planning
///
/// Places batches of time slots into the free periods of a day or a week
/// and resolves conflicts left in an existing day. Tasks that cannot be
/// placed are handed back to the caller rather than dropped.

use std::cmp::Reverse;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::time_utils::task_duration;
use crate::domain::{
    DaySchedule, NewTimeSlot, Scheduled, SlotId, TaskType, TimeSlot, UserPreferences, WeekSchedule,
};
use crate::schedule::ScheduleService;

/// Committed minutes above which a day counts as busy
const BUSY_DAY_MINUTES: i64 = 8 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnplacedReason {
    /// No free period of the day is long enough
    NoFreePeriod,
    /// Every day of the week scored too low
    NoSuitableDay,
    /// The day refused the slot
    Conflict,
}

/// A task the planner handed back
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnplacedTask {
    pub task: TimeSlot,
    pub reason: UnplacedReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPlanOutcome {
    pub schedule: DaySchedule,
    pub placed: Vec<SlotId>,
    pub unplaced: Vec<UnplacedTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPlanOutcome {
    pub schedule: WeekSchedule,
    pub placed: Vec<SlotId>,
    pub unplaced: Vec<UnplacedTask>,
}

/// One conflict the optimiser settled by moving a slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConflict {
    pub moved: SlotId,
    pub moved_title: String,
    pub kept_title: String,
    pub new_start: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OptimizeOutcome {
    pub resolved: Vec<ResolvedConflict>,
    /// Slots taken out of the day because no free period could hold them
    pub unresolved: Vec<UnplacedTask>,
    /// High or urgent slots lying outside the productive hours
    pub outside_productive_hours: Vec<SlotId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlanningService;

impl PlanningService {
    pub fn new() -> Self {
        Self
    }

    /// Plan one day: seed meals, then place `tasks` highest priority first
    pub fn generate_daily_plan(
        &self,
        schedule: &mut ScheduleService,
        date: NaiveDate,
        tasks: Vec<TimeSlot>,
        prefs: &UserPreferences,
    ) -> DailyPlanOutcome {
        info!("Generating daily plan for {} with {} tasks", date, tasks.len());
        let day = schedule.get_or_create_day(date);

        Self::seed_routine(day, date, prefs);

        let mut sorted = tasks;
        sorted.sort_by_key(|task| (task.priority.rank(), task.start_time));

        let mut placed = Vec::new();
        let mut unplaced = Vec::new();
        for task in sorted {
            match Self::place_in_day(day, task, prefs) {
                Ok((id, _)) => placed.push(id),
                Err(rejected) => {
                    warn!("Could not place '{}' on {}: {:?}", rejected.task.title, date, rejected.reason);
                    unplaced.push(rejected);
                }
            }
        }

        info!("Daily plan for {}: {} placed, {} unplaced", date, placed.len(), unplaced.len());
        DailyPlanOutcome {
            schedule: day.clone(),
            placed,
            unplaced,
        }
    }

    /// Plan a week starting at `monday`, picking the best-scoring day per task
    pub fn generate_weekly_plan(
        &self,
        schedule: &mut ScheduleService,
        monday: NaiveDate,
        tasks: Vec<TimeSlot>,
        prefs: &UserPreferences,
    ) -> WeeklyPlanOutcome {
        info!("Generating weekly plan from {} with {} tasks", monday, tasks.len());
        let week = schedule.create_week_schedule(monday);

        let mut sorted = tasks;
        sorted.sort_by_key(|task| (task.priority.rank(), task.task_type.weight(), Reverse(task.duration_minutes())));

        let mut placed = Vec::new();
        let mut unplaced = Vec::new();
        for task in sorted {
            let Some(index) = Self::best_day(week, &task, prefs) else {
                warn!("No suitable day for '{}' in week of {}", task.title, monday);
                unplaced.push(UnplacedTask {
                    task,
                    reason: UnplacedReason::NoSuitableDay,
                });
                continue;
            };

            let result = match week.day_mut(index) {
                Ok(day) => Self::place_in_day(day, task, prefs),
                Err(_) => Err(UnplacedTask {
                    task,
                    reason: UnplacedReason::NoSuitableDay,
                }),
            };
            match result {
                Ok((id, start)) => {
                    debug!("Placed slot {} at {}", id, start);
                    placed.push(id);
                }
                Err(rejected) => {
                    warn!("Could not place '{}' on weekday {}: {:?}", rejected.task.title, index, rejected.reason);
                    unplaced.push(rejected);
                }
            }
        }
        week.refresh_statistics();

        info!("Weekly plan from {}: {} placed, {} unplaced", monday, placed.len(), unplaced.len());
        WeeklyPlanOutcome {
            schedule: week.clone(),
            placed,
            unplaced,
        }
    }

    /// Resolve conflicting pairs by moving one side of each
    ///
    /// Flexible loses to fixed. Between slots of the same type the lower
    /// priority moves; on equal priority the second of the pair moves.
    pub fn optimize_schedule(&self, day: &mut DaySchedule, prefs: &UserPreferences) -> OptimizeOutcome {
        info!("Optimizing schedule for {}", day.date());
        let pairs: Vec<(SlotId, SlotId)> = day.conflicts().iter().map(|(a, b)| (a.id, b.id)).collect();

        let mut outcome = OptimizeOutcome::default();
        for (first_id, second_id) in pairs {
            let (Some(first), Some(second)) = (day.slot(first_id), day.slot(second_id)) else {
                continue;
            };
            // An earlier move may already have cleared this pair
            if !first.conflicts_with(second) {
                continue;
            }

            let (victim_id, kept_title) = if Self::should_move_first(first, second) {
                (first_id, second.title.clone())
            } else {
                (second_id, first.title.clone())
            };

            let Some(victim) = day.remove_slot(victim_id) else {
                continue;
            };
            let moved_title = victim.title.clone();
            match Self::place_in_day(day, victim, prefs) {
                Ok((id, new_start)) => {
                    debug!("Moved '{}' to {} to clear conflict with '{}'", moved_title, new_start, kept_title);
                    outcome.resolved.push(ResolvedConflict {
                        moved: id,
                        moved_title,
                        kept_title,
                        new_start,
                    });
                }
                Err(rejected) => {
                    warn!("Could not reschedule '{}' out of conflict with '{}'", moved_title, kept_title);
                    outcome.unresolved.push(rejected);
                }
            }
        }

        outcome.outside_productive_hours = day
            .slots()
            .iter()
            .filter(|slot| slot.priority.rank() <= 1)
            .filter(|slot| {
                let start = slot.start_time.time();
                let end = slot.end_time.time();
                start < prefs.productive_hours_start || end > prefs.productive_hours_end
            })
            .map(|slot| slot.id)
            .collect();

        info!(
            "Optimized {}: {} resolved, {} unresolved",
            day.date(),
            outcome.resolved.len(),
            outcome.unresolved.len()
        );
        outcome
    }

    fn should_move_first(first: &TimeSlot, second: &TimeSlot) -> bool {
        match (first.task_type, second.task_type) {
            (TaskType::Flexible, TaskType::Fixed) => true,
            (TaskType::Fixed, TaskType::Flexible) => false,
            _ => second.priority.outranks(first.priority),
        }
    }

    /// Breakfast, lunch and dinner; a meal that clashes with an existing
    /// slot is skipped
    fn seed_routine(day: &mut DaySchedule, date: NaiveDate, prefs: &UserPreferences) {
        let task_type = if prefs.flexible_meal_time {
            TaskType::Flexible
        } else {
            TaskType::Fixed
        };

        let length = match task_duration(prefs.meal_duration) {
            Ok(length) => length,
            Err(e) => {
                warn!("Skipped meals on {}: {}", date, e);
                return;
            }
        };

        for (name, time) in prefs.meals() {
            let start = date.and_time(time);
            let params = NewTimeSlot::new(name, start, start + length)
                .task_type(task_type)
                .parallel(false);

            match TimeSlot::new(params) {
                Ok(meal) => {
                    if let Err(reason) = day.add_slot(meal) {
                        debug!("Skipped {} on {}: {}", name, date, reason);
                    }
                }
                Err(e) => warn!("Invalid {} slot on {}: {}", name, date, e),
            }
        }
    }

    /// Move `task` to the start of the first free period that holds it
    /// plus the buffer, within the waking hours
    fn place_in_day(
        day: &mut DaySchedule,
        mut task: TimeSlot,
        prefs: &UserPreferences,
    ) -> Result<(SlotId, NaiveDateTime), UnplacedTask> {
        let (wake, sleep) = Self::day_bounds(prefs);
        let required = task.duration_minutes() + prefs.buffer_time;

        let period = day
            .free_periods_within(wake, sleep)
            .into_iter()
            .find(|(start, end)| (*end - *start).num_minutes() >= required);

        let Some((start, _)) = period else {
            return Err(UnplacedTask {
                task,
                reason: UnplacedReason::NoFreePeriod,
            });
        };

        task.relocate(start);
        let id = task.id;
        match day.check_slot(&task) {
            Ok(()) => {
                // check_slot passed, so add_slot cannot reject
                let _ = day.add_slot(task);
                Ok((id, start))
            }
            Err(_) => Err(UnplacedTask {
                task,
                reason: UnplacedReason::Conflict,
            }),
        }
    }

    fn day_bounds(prefs: &UserPreferences) -> (NaiveTime, NaiveTime) {
        (prefs.wake_up_time, prefs.sleep_time)
    }

    /// Weekday index with the highest score, or `None` when nothing scores
    /// above zero
    fn best_day(week: &WeekSchedule, task: &TimeSlot, prefs: &UserPreferences) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, day) in week.days().iter().enumerate() {
            let score = Self::score_day(day, task, prefs);
            debug!("Day {} scores {:.1} for '{}'", index, score, task.title);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((index, score));
            }
        }
        best.filter(|(_, score)| *score > 0.0).map(|(index, _)| index)
    }

    /// With these weights the lowest possible score is 0.3, so every week
    /// yields a best day and `NoSuitableDay` only arises if the weights change
    fn score_day(day: &DaySchedule, task: &TimeSlot, prefs: &UserPreferences) -> f64 {
        let mut score = 1.0;

        if prefs.is_work_day(day.date().weekday()) {
            score += 0.5;
        }

        let (wake, sleep) = Self::day_bounds(prefs);
        if day.largest_gap_within(wake, sleep) >= task.duration_minutes() + prefs.buffer_time {
            score += 0.3;
        } else {
            score -= 0.5;
        }

        if day.total_duration() > BUSY_DAY_MINUTES {
            score -= 0.2;
        }

        f64::max(0.0, score)
    }
}
