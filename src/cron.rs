//! Cron expression parser
//!
//! Supports 5-field and 6-field cron syntax:
//! ```text
//! ┌───────────── second (0-59, 6-field form only)
//! │ ┌───────────── minute (0-59)
//! │ │ ┌───────────── hour (0-23)
//! │ │ │ ┌───────────── day of month (1-31)
//! │ │ │ │ ┌───────────── month (1-12 or JAN-DEC)
//! │ │ │ │ │ ┌───────────── day of week (0-7 or SUN-SAT, 0 and 7 = Sunday)
//! │ │ │ │ │ │
//! * * * * * *
//! ```
//!
//! Special characters:
//! - `*` / `?` - any value
//! - `,` - value list separator (e.g., `1,3,5`)
//! - `-` - range (e.g., `1-5`, `MON-FRI`)
//! - `/` - step (e.g., `*/5`, `0-30/5` or `5/15`)
//!
//! Macros: `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`,
//! `@midnight`, `@hourly`.

use crate::error::{RecurrenceError, Result};
use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike,
};
use std::collections::BTreeSet;

/// Default search horizon for [`CronExpression::next_after`]
pub const DEFAULT_SEARCH_YEARS: u32 = 4;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

const MACROS: [(&str, &str); 7] = [
    ("@yearly", "0 0 1 1 *"),
    ("@annually", "0 0 1 1 *"),
    ("@monthly", "0 0 1 * *"),
    ("@weekly", "0 0 * * 0"),
    ("@daily", "0 0 * * *"),
    ("@midnight", "0 0 * * *"),
    ("@hourly", "0 * * * *"),
];

/// A parsed cron expression
#[derive(Debug, Clone)]
pub struct CronExpression {
    /// Original expression string
    pub expression: String,
    /// Allowed seconds (0-59)
    seconds: BTreeSet<u32>,
    /// Allowed minutes (0-59)
    minutes: BTreeSet<u32>,
    /// Allowed hours (0-23)
    hours: BTreeSet<u32>,
    /// Allowed days of month (1-31)
    days: BTreeSet<u32>,
    /// Allowed months (1-12)
    months: BTreeSet<u32>,
    /// Allowed days of week (0-6, 0=Sunday)
    weekdays: BTreeSet<u32>,
}

impl CronExpression {
    /// Parse a cron expression string
    ///
    /// # Examples
    ///
    /// ```
    /// use a3s_recurrence::CronExpression;
    ///
    /// // Every 5 minutes
    /// let expr = CronExpression::parse("*/5 * * * *").unwrap();
    ///
    /// // Every 30 seconds
    /// let expr = CronExpression::parse("*/30 * * * * *").unwrap();
    ///
    /// // Weekdays at 9 AM
    /// let expr = CronExpression::parse("0 9 * * MON-FRI").unwrap();
    /// ```
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();

        let body = if trimmed.starts_with('@') {
            let lowered = trimmed.to_lowercase();
            MACROS
                .iter()
                .find(|(name, _)| *name == lowered)
                .map(|(_, body)| *body)
                .ok_or_else(|| {
                    RecurrenceError::InvalidCron(format!("Unknown macro '{}'", trimmed))
                })?
        } else {
            trimmed
        };

        let parts: Vec<&str> = body.split_whitespace().collect();
        let (second_field, fields) = match parts.len() {
            5 => ("0", &parts[..]),
            6 => (parts[0], &parts[1..]),
            n => {
                return Err(RecurrenceError::InvalidCron(format!(
                    "Expected 5 or 6 fields, got {}",
                    n
                )))
            }
        };

        let seconds = parse_field(second_field, 0, 59, "second", &[])?;
        let minutes = parse_field(fields[0], 0, 59, "minute", &[])?;
        let hours = parse_field(fields[1], 0, 23, "hour", &[])?;
        let days = parse_field(fields[2], 1, 31, "day", &[])?;
        let months = parse_field(fields[3], 1, 12, "month", &MONTH_NAMES)?;
        let weekdays = parse_field(fields[4], 0, 7, "weekday", &WEEKDAY_NAMES)?
            .into_iter()
            .map(|d| d % 7)
            .collect();

        Ok(Self {
            expression: expression.to_string(),
            seconds,
            minutes,
            hours,
            days,
            months,
            weekdays,
        })
    }

    /// Calculate the next fire time strictly after the given datetime
    ///
    /// Fields are matched against the wall clock of `after`'s timezone.
    pub fn next_after<Z: TimeZone>(&self, after: &DateTime<Z>) -> Option<DateTime<Z>> {
        self.next_within(after, DEFAULT_SEARCH_YEARS)
    }

    /// Like [`next_after`](Self::next_after) with an explicit search horizon in years
    ///
    /// Local times skipped by a DST transition never fire; repeated local
    /// times fire on their first occurrence after `after`.
    pub fn next_within<Z: TimeZone>(
        &self,
        after: &DateTime<Z>,
        years: u32,
    ) -> Option<DateTime<Z>> {
        let tz = after.timezone();

        // Start from the next whole second
        let mut current = after
            .naive_local()
            .with_nanosecond(0)?
            .checked_add_signed(Duration::seconds(1))?;
        let limit = current.checked_add_signed(Duration::days(366 * i64::from(years)))?;

        while current <= limit {
            let date = current.date();

            if !self.months.contains(&date.month()) {
                current = first_of_next_month(date)?.and_hms_opt(0, 0, 0)?;
                continue;
            }

            if !self.days.contains(&date.day())
                || !self
                    .weekdays
                    .contains(&date.weekday().num_days_from_sunday())
            {
                current = date.succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }

            if !self.hours.contains(&current.hour()) {
                current = match self.hours.range(current.hour() + 1..).next() {
                    Some(&hour) => date.and_hms_opt(hour, 0, 0)?,
                    None => date.succ_opt()?.and_hms_opt(0, 0, 0)?,
                };
                continue;
            }

            if !self.minutes.contains(&current.minute()) {
                current = match self.minutes.range(current.minute() + 1..).next() {
                    Some(&minute) => date.and_hms_opt(current.hour(), minute, 0)?,
                    None => next_hour(current)?,
                };
                continue;
            }

            if !self.seconds.contains(&current.second()) {
                current = match self.seconds.range(current.second() + 1..).next() {
                    Some(&second) => date.and_hms_opt(current.hour(), current.minute(), second)?,
                    None => next_minute(current)?,
                };
                continue;
            }

            match tz.from_local_datetime(&current) {
                LocalResult::Single(dt) if dt > *after => return Some(dt),
                LocalResult::Ambiguous(earliest, latest) => {
                    if earliest > *after {
                        return Some(earliest);
                    }
                    if latest > *after {
                        return Some(latest);
                    }
                }
                _ => {}
            }

            current = current.checked_add_signed(Duration::seconds(1))?;
        }

        None
    }
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

fn next_hour(current: NaiveDateTime) -> Option<NaiveDateTime> {
    current
        .date()
        .and_hms_opt(current.hour(), 0, 0)?
        .checked_add_signed(Duration::hours(1))
}

fn next_minute(current: NaiveDateTime) -> Option<NaiveDateTime> {
    current
        .date()
        .and_hms_opt(current.hour(), current.minute(), 0)?
        .checked_add_signed(Duration::minutes(1))
}

/// Parse a single value, accepting names when the field has them
fn parse_value(raw: &str, min: u32, names: &[&str], name: &str) -> Result<u32> {
    if let Ok(value) = raw.parse::<u32>() {
        return Ok(value);
    }

    let lowered = raw.to_lowercase();
    names
        .iter()
        .position(|candidate| *candidate == lowered)
        .map(|idx| idx as u32 + min)
        .ok_or_else(|| {
            RecurrenceError::InvalidCron(format!("Invalid value '{}' in {}", raw, name))
        })
}

/// Parse a single cron field
fn parse_field(
    field: &str,
    min: u32,
    max: u32,
    name: &str,
    names: &[&str],
) -> Result<BTreeSet<u32>> {
    let mut values = BTreeSet::new();

    for part in field.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        // Handle step values (e.g., */5, 0-30/5 or 5/15)
        let (range_part, step) = if let Some(idx) = part.find('/') {
            let step_str = &part[idx + 1..];
            let step: u32 = step_str.parse().map_err(|_| {
                RecurrenceError::InvalidCron(format!(
                    "Invalid step value '{}' in {}",
                    step_str, name
                ))
            })?;
            if step == 0 {
                return Err(RecurrenceError::InvalidCron(format!(
                    "Step value cannot be 0 in {}",
                    name
                )));
            }
            (&part[..idx], Some(step))
        } else {
            (part, None)
        };

        // Parse the range part
        let (start, end) = if range_part == "*" || range_part == "?" {
            (min, max)
        } else if let Some(idx) = range_part.find('-') {
            let start = parse_value(&range_part[..idx], min, names, name)?;
            let end = parse_value(&range_part[idx + 1..], min, names, name)?;
            (start, end)
        } else {
            let value = parse_value(range_part, min, names, name)?;
            // `5/15` runs from 5 to the end of the field
            if step.is_some() {
                (value, max)
            } else {
                (value, value)
            }
        };

        // Validate range
        if start < min || start > max {
            return Err(RecurrenceError::InvalidCron(format!(
                "Value {} out of range ({}-{}) in {}",
                start, min, max, name
            )));
        }
        if end < min || end > max {
            return Err(RecurrenceError::InvalidCron(format!(
                "Value {} out of range ({}-{}) in {}",
                end, min, max, name
            )));
        }
        if start > end {
            return Err(RecurrenceError::InvalidCron(format!(
                "Invalid range {}-{} in {}",
                start, end, name
            )));
        }

        // Add values with step
        let step = step.unwrap_or(1);
        let mut current = Some(start);
        while let Some(value) = current.filter(|v| *v <= end) {
            values.insert(value);
            current = value.checked_add(step);
        }
    }

    if values.is_empty() {
        return Err(RecurrenceError::InvalidCron(format!(
            "No valid values in {}",
            name
        )));
    }

    Ok(values)
}
