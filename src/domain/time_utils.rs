/// Date and time calculus
///
/// Pure functions over calendar dates and clock times. Anything that needs
/// "now" takes it as an argument or reads it from an injected `Clock`, so
/// every function here is deterministic under test.

use std::cmp::{max, min};

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Highest epoch-relative week number accepted anywhere (about 1000 years)
pub const MAX_WEEK_NUMBER: u32 = 52_000;

/// Longest task duration accepted from callers, in minutes
pub const MAX_TASK_MINUTES: i64 = 24 * 60;

/// Source of the current local time
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall-clock time of the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at a given instant (tests, replays)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    pub fn at(date: NaiveDate, hour: u32, minute: u32) -> Self {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        Self(date.and_time(time))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Parse a "YYYY-MM-DD" date
pub fn parse_date(s: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| DomainError::InvalidDate(format!("'{}' (expected YYYY-MM-DD)", s)))
}

/// Parse an "HH:MM" (or "HH:MM:SS") clock time
///
/// Times are stored at minute precision, so seconds are dropped here and
/// what callers validate is exactly what gets persisted.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime, DomainError> {
    let trimmed = s.trim();
    let time = NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| DomainError::InvalidTime(format!("'{}' (expected HH:MM)", s)))?;
    Ok(truncate_to_minute(time))
}

pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// A caller-supplied task length as a `Duration`, 1 to `MAX_TASK_MINUTES`
pub fn task_duration(minutes: i64) -> Result<Duration, DomainError> {
    if !(1..=MAX_TASK_MINUTES).contains(&minutes) {
        return Err(DomainError::Validation {
            message: format!("duration must be 1-{} minutes, got {}", MAX_TASK_MINUTES, minutes),
        });
    }
    TimeDelta::try_minutes(minutes).ok_or_else(|| DomainError::Validation {
        message: format!("duration of {} minutes is out of range", minutes),
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Week number of `target` counted from `epoch`, starting at 1
///
/// Dates before the epoch clamp to week 1.
pub fn calculate_week_number(epoch: NaiveDate, target: NaiveDate) -> u32 {
    let days = (target - epoch).num_days();
    let week = days.div_euclid(7) + 1;
    max(1, week) as u32
}

/// First and last day of the given epoch-relative week
///
/// Fails for week 0 and for weeks whose dates fall outside the calendar.
pub fn week_date_range(epoch: NaiveDate, week_number: u32) -> Result<(NaiveDate, NaiveDate), DomainError> {
    let out_of_range = || DomainError::Validation {
        message: format!("week {} is out of range", week_number),
    };
    if week_number == 0 {
        return Err(out_of_range());
    }
    let start = TimeDelta::try_days(7 * (week_number as i64 - 1))
        .and_then(|offset| epoch.checked_add_signed(offset))
        .ok_or_else(out_of_range)?;
    let end = TimeDelta::try_days(6)
        .and_then(|offset| start.checked_add_signed(offset))
        .ok_or_else(out_of_range)?;
    Ok((start, end))
}

/// "YYYY-MM-DD - YYYY-MM-DD" label for a week
pub fn week_date_range_label(epoch: NaiveDate, week_number: u32) -> Result<String, DomainError> {
    let (start, end) = week_date_range(epoch, week_number)?;
    Ok(format!("{} - {}", format_date(start), format_date(end)))
}

/// Resolve a relative day term against `base`
///
/// Recognised terms are returned as absolute dates. Anything else is
/// assumed to be an absolute date already and comes back unchanged.
pub fn resolve_relative_date(term: &str, base: NaiveDate) -> String {
    let offset = match term.trim().to_lowercase().as_str() {
        "today" | "今天" => Some(0),
        "tomorrow" | "明天" => Some(1),
        "yesterday" | "昨天" => Some(-1),
        "day after tomorrow" | "the day after tomorrow" | "后天" => Some(2),
        "day before yesterday" | "the day before yesterday" | "前天" => Some(-2),
        _ => None,
    };

    match offset.and_then(|days| base.checked_add_signed(Duration::days(days))) {
        Some(date) => format_date(date),
        None => term.trim().to_string(),
    }
}

/// Resolve a relative term and parse the result as a date
pub fn resolve_date(term: &str, base: NaiveDate) -> Result<NaiveDate, DomainError> {
    parse_date(&resolve_relative_date(term, base))
}

/// Half-open interval overlap; abutting intervals do not overlap
pub fn overlaps<T: Ord + Copy>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    max(a_start, b_start) < min(a_end, b_end)
}

/// Coarse part of the day an hour falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    LateNight,
}

impl DayPart {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => DayPart::Morning,
            12..=17 => DayPart::Afternoon,
            18..=21 => DayPart::Evening,
            _ => DayPart::LateNight,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayPart::Morning => "morning",
            DayPart::Afternoon => "afternoon",
            DayPart::Evening => "evening",
            DayPart::LateNight => "late night",
        }
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// Short description of the current moment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSnapshot {
    pub date: String,
    pub time: String,
    pub weekday: String,
    pub is_weekend: bool,
}

pub fn current_time_snapshot(now: NaiveDateTime) -> TimeSnapshot {
    TimeSnapshot {
        date: format_date(now.date()),
        time: format_hhmm(now.time()),
        weekday: weekday_name(now.weekday()).to_string(),
        is_weekend: is_weekend(now.weekday()),
    }
}

/// Richer description of the current moment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedTimeInfo {
    pub date: String,
    pub time: String,
    pub datetime: String,
    pub weekday: String,
    pub is_weekend: bool,
    pub day_part: DayPart,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub day_of_year: u32,
    pub iso_week: u32,
}

pub fn detailed_time_info(now: NaiveDateTime) -> DetailedTimeInfo {
    DetailedTimeInfo {
        date: format_date(now.date()),
        time: now.format("%H:%M:%S").to_string(),
        datetime: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        weekday: weekday_name(now.weekday()).to_string(),
        is_weekend: is_weekend(now.weekday()),
        day_part: DayPart::from_hour(now.hour()),
        hour: now.hour(),
        minute: now.minute(),
        second: now.second(),
        year: now.year(),
        month: now.month(),
        day: now.day(),
        day_of_year: now.ordinal(),
        iso_week: now.iso_week().week(),
    }
}

/// Facts about an arbitrary calendar date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateInfo {
    pub date: String,
    pub weekday: String,
    pub is_weekend: bool,
    pub day_of_year: u32,
}

pub fn date_info(date: NaiveDate) -> DateInfo {
    DateInfo {
        date: format_date(date),
        weekday: weekday_name(date.weekday()).to_string(),
        is_weekend: is_weekend(date.weekday()),
        day_of_year: date.ordinal(),
    }
}

/// Daily boundaries scanned by `time_until_next_period`
const PERIOD_BOUNDARIES: [(u32, &str); 4] = [
    (6, "morning"),
    (12, "noon"),
    (18, "evening"),
    (22, "night"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextPeriod {
    pub label: String,
    pub target: NaiveDateTime,
    pub remaining_minutes: i64,
}

impl NextPeriod {
    pub fn remaining(&self) -> Duration {
        Duration::minutes(self.remaining_minutes)
    }
}

/// First boundary strictly after `now`; tomorrow 06:00 when none is left today
pub fn time_until_next_period(now: NaiveDateTime) -> NextPeriod {
    let today = now.date();
    let next_today = PERIOD_BOUNDARIES.iter().find_map(|&(hour, label)| {
        let boundary = today.and_hms_opt(hour, 0, 0)?;
        (boundary > now).then_some((boundary, label))
    });

    let (target, label) = match next_today {
        Some(found) => found,
        None => {
            let (hour, label) = PERIOD_BOUNDARIES[0];
            let tomorrow = today + Duration::days(1);
            (tomorrow.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)), label)
        }
    };

    NextPeriod {
        label: label.to_string(),
        target,
        remaining_minutes: (target - now).num_minutes(),
    }
}

/// Progress through the current Monday-start week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekProgress {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    /// 1 = Monday .. 7 = Sunday
    pub current_day: u32,
    pub days_elapsed: u32,
    pub days_remaining: u32,
    pub percent_elapsed: f64,
    pub hours_elapsed: f64,
    pub hours_remaining: f64,
}

pub fn week_progress(now: NaiveDateTime) -> WeekProgress {
    let days_since_monday = now.weekday().num_days_from_monday();
    let week_start = now.date() - Duration::days(days_since_monday as i64);
    let start_instant = week_start.and_time(NaiveTime::MIN);
    // Week ends at Sunday 23:59:59
    let end_instant = start_instant + Duration::days(7) - Duration::seconds(1);

    let total_seconds = (end_instant - start_instant).num_seconds() as f64;
    let elapsed_seconds = (now - start_instant).num_seconds() as f64;

    WeekProgress {
        week_start,
        week_end: end_instant.date(),
        current_day: days_since_monday + 1,
        days_elapsed: days_since_monday + 1,
        days_remaining: 7 - (days_since_monday + 1),
        percent_elapsed: round_to(elapsed_seconds / total_seconds * 100.0, 2),
        hours_elapsed: round_to(elapsed_seconds / 3600.0, 1),
        hours_remaining: round_to((total_seconds - elapsed_seconds) / 3600.0, 1),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Human readable duration such as "1h 30m 5s"
pub fn format_duration(seconds: i64) -> String {
    if seconds < 0 {
        return "ended".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if secs > 0 {
        parts.push(format!("{}s", secs));
    }

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeDifference {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub total_seconds: i64,
    pub formatted: String,
}

pub fn time_difference(start: NaiveDateTime, end: NaiveDateTime) -> TimeDifference {
    let total = (end - start).num_seconds();
    TimeDifference {
        days: total.div_euclid(86_400),
        hours: total.rem_euclid(86_400) / 3600,
        minutes: total.rem_euclid(3600) / 60,
        seconds: total.rem_euclid(60),
        total_seconds: total,
        formatted: format_duration(total),
    }
}

/// Next date strictly after `date` falling on `weekday`
pub fn next_weekday(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let current = date.weekday().num_days_from_monday() as i64;
    let wanted = weekday.num_days_from_monday() as i64;
    let mut ahead = (wanted - current).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    date + Duration::days(ahead)
}

/// Monday of the week containing `date`
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// First and last representable instant of a day
pub fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(NaiveTime::MIN);
    let end = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| start + Duration::days(1) - Duration::milliseconds(1));
    (start, end)
}

/// Serde helpers storing a `NaiveTime` as "HH:MM"
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hhmm(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_hhmm(&raw).map_err(serde::de::Error::custom)
    }
}
