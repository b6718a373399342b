/// Clock tools
///
/// Let the client anchor relative phrases ("tomorrow", "this week") to the
/// server's notion of now. All of them read time from the injected `Clock`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::time_utils::{
    current_time_snapshot, date_info, detailed_time_info, format_date, format_duration, resolve_date,
    time_until_next_period, week_progress, DateInfo, DetailedTimeInfo, NextPeriod, TimeSnapshot, WeekProgress,
};
use crate::domain::{Clock, DomainError};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetCurrentTimeParams {
    /// Include day part, week number and similar details
    #[serde(default)]
    pub detailed: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CurrentTime {
    Brief(TimeSnapshot),
    Detailed(DetailedTimeInfo),
}

#[derive(Debug, Serialize)]
pub struct CurrentTimeResponse {
    pub success: bool,
    pub message: String,
    pub time: CurrentTime,
}

pub fn get_current_time<C: Clock>(clock: &C, params: GetCurrentTimeParams) -> CurrentTimeResponse {
    let now = clock.now();
    let brief = current_time_snapshot(now);
    let message = format!("It is {} {} ({})", brief.date, brief.time, brief.weekday);

    let time = if params.detailed {
        CurrentTime::Detailed(detailed_time_info(now))
    } else {
        CurrentTime::Brief(brief)
    };

    CurrentTimeResponse {
        success: true,
        message,
        time,
    }
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetTimeUntilNextPeriodParams {}

#[derive(Debug, Serialize)]
pub struct NextPeriodResponse {
    pub success: bool,
    pub message: String,
    pub next_period: NextPeriod,
}

pub fn get_time_until_next_period<C: Clock>(clock: &C, _params: GetTimeUntilNextPeriodParams) -> NextPeriodResponse {
    let next_period = time_until_next_period(clock.now());
    NextPeriodResponse {
        success: true,
        message: format!(
            "{} until {} starts at {}",
            format_duration(next_period.remaining_minutes * 60),
            next_period.label,
            next_period.target.format("%H:%M")
        ),
        next_period,
    }
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetWeekProgressParams {}

#[derive(Debug, Serialize)]
pub struct WeekProgressResponse {
    pub success: bool,
    pub message: String,
    pub progress: WeekProgress,
}

pub fn get_week_progress<C: Clock>(clock: &C, _params: GetWeekProgressParams) -> WeekProgressResponse {
    let progress = week_progress(clock.now());
    WeekProgressResponse {
        success: true,
        message: format!(
            "Day {} of 7, {:.1}% of the week has passed",
            progress.current_day, progress.percent_elapsed
        ),
        progress,
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ParseRelativeDateParams {
    /// "today", "tomorrow", "yesterday", "day after tomorrow" or "YYYY-MM-DD"
    pub term: String,
    /// Date the term is relative to (default today)
    pub base_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParsedDateResponse {
    pub success: bool,
    pub message: String,
    pub date: String,
    pub info: DateInfo,
}

pub fn parse_relative_date<C: Clock>(
    clock: &C,
    params: ParseRelativeDateParams,
) -> Result<ParsedDateResponse, DomainError> {
    let base = match params.base_date.as_deref() {
        Some(raw) => resolve_date(raw, clock.today())?,
        None => clock.today(),
    };
    let date = resolve_date(&params.term, base)?;
    let info = date_info(date);

    Ok(ParsedDateResponse {
        success: true,
        message: format!("'{}' is {} ({})", params.term.trim(), format_date(date), info.weekday),
        date: format_date(date),
        info,
    })
}
