//! Natural-language daily anchors
//!
//! Reads `repeatAt` strings such as `"3:30pm"`, `"noon"` or
//! `"tomorrow at 9am"` as a time of day, then places that time on the
//! calendar relative to "now".
//!
//! ## Supported Formats
//! - `"3pm"`, `"3 pm"`, `"3:30pm"`, `"11:15:30 am"`
//! - 24-hour `"15:30"`, `"07:05:10"`
//! - `"noon"`, `"midnight"`
//! - Optional `"at"` and a leading or trailing `"today"` / `"tomorrow"`

use crate::error::{RecurrenceError, Result};
use crate::timezone::resolve_local;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

/// A parsed daily anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Original anchor string
    pub expression: String,
    /// Days after today the first occurrence falls on (0 = today)
    pub day_offset: u64,
    /// Wall-clock time of day
    pub time: NaiveTime,
}

impl Anchor {
    /// Parse an anchor string
    ///
    /// # Examples
    ///
    /// ```
    /// use a3s_recurrence::Anchor;
    /// use chrono::NaiveTime;
    ///
    /// let anchor = Anchor::parse("3:30pm").unwrap();
    /// assert_eq!(anchor.time, NaiveTime::from_hms_opt(15, 30, 0).unwrap());
    ///
    /// assert!(Anchor::parse("whenever").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let lowered = input.trim().to_lowercase();
        let invalid = || RecurrenceError::InvalidAnchor(input.to_string());

        let mut day_offset: Option<u64> = None;
        let mut time: Option<NaiveTime> = None;

        for token in merge_meridiem(&lowered) {
            match token.as_str() {
                "at" => continue,
                "today" | "tomorrow" => {
                    let offset = if token == "today" { 0 } else { 1 };
                    if day_offset.replace(offset).is_some() {
                        return Err(invalid());
                    }
                }
                _ => {
                    let parsed = match token.as_str() {
                        "noon" => NaiveTime::from_hms_opt(12, 0, 0),
                        "midnight" => NaiveTime::from_hms_opt(0, 0, 0),
                        other => parse_time(other),
                    }
                    .ok_or_else(invalid)?;
                    if time.replace(parsed).is_some() {
                        return Err(invalid());
                    }
                }
            }
        }

        Ok(Self {
            expression: input.to_string(),
            day_offset: day_offset.unwrap_or(0),
            time: time.ok_or_else(invalid)?,
        })
    }

    /// The anchor's instant on a given local calendar day
    pub fn on(&self, day: NaiveDate, tz: &Tz) -> Result<DateTime<Utc>> {
        resolve_local(tz, day.and_time(self.time)).ok_or_else(|| {
            RecurrenceError::OutOfRange(format!("{} {} in {}", day, self.time, tz.name()))
        })
    }

    /// Resolve against `now`, rolling forward when the result would not
    /// advance past `reference`
    ///
    /// The first candidate is today (in `tz`) plus the day offset; if that
    /// is not after `reference` the anchor moves to tomorrow, or to the
    /// first day after `reference` when that is later still.
    pub fn next_after(
        &self,
        reference: DateTime<Utc>,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<DateTime<Utc>> {
        let out_of_range = || RecurrenceError::OutOfRange(self.expression.clone());
        let today = now.with_timezone(tz).date_naive();
        let day = today
            .checked_add_days(Days::new(self.day_offset))
            .ok_or_else(out_of_range)?;

        let next = self.on(day, tz)?;
        if next > reference {
            return Ok(next);
        }

        let tomorrow = day.succ_opt().ok_or_else(out_of_range)?;
        let day = tomorrow.max(reference.with_timezone(tz).date_naive());
        let next = self.on(day, tz)?;
        if next > reference {
            return Ok(next);
        }
        self.on(day.succ_opt().ok_or_else(out_of_range)?, tz)
    }
}

/// Split on whitespace, gluing a detached meridiem onto the preceding time ("3 pm")
fn merge_meridiem(input: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();

    for word in input.split_whitespace() {
        let is_meridiem = matches!(word, "am" | "pm" | "a.m." | "p.m.");
        match tokens.last_mut() {
            Some(last) if is_meridiem && last.starts_with(|c: char| c.is_ascii_digit()) => {
                last.push_str(word)
            }
            _ => tokens.push(word.to_string()),
        }
    }

    tokens
}

/// Parse "3pm", "3:30pm", "15:30" or "15:30:45"
fn parse_time(token: &str) -> Option<NaiveTime> {
    let (body, meridiem) = if let Some(body) = token
        .strip_suffix("pm")
        .or_else(|| token.strip_suffix("p.m."))
    {
        (body, Some(true))
    } else if let Some(body) = token
        .strip_suffix("am")
        .or_else(|| token.strip_suffix("a.m."))
    {
        (body, Some(false))
    } else {
        (token, None)
    };

    let parts: Vec<&str> = body.split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    // Bare "3" is ambiguous without am/pm
    if parts.len() == 1 && meridiem.is_none() {
        return None;
    }
    if parts[0].is_empty() || parts[0].len() > 2 || parts[1..].iter().any(|p| p.len() != 2) {
        return None;
    }
    if !parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    let mut hour: u32 = parts[0].parse().ok()?;
    let minute: u32 = parts.get(1).map_or(Some(0), |m| m.parse().ok())?;
    let second: u32 = parts.get(2).map_or(Some(0), |s| s.parse().ok())?;

    match meridiem {
        Some(is_pm) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            if is_pm && hour < 12 {
                hour += 12;
            } else if !is_pm && hour == 12 {
                hour = 0;
            }
        }
        None if hour > 23 => return None,
        None => {}
    }

    NaiveTime::from_hms_opt(hour, minute, second)
}
