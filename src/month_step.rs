//! Fixed-N-months stepping
//!
//! Advances a last-run date by whole calendar months while holding the day
//! of month fixed. Months where that day does not exist (the 31st of
//! February) are skipped by stepping again, up to a hard attempt bound.

use crate::error::{RecurrenceError, Result};
use crate::timezone::{resolve_local, time_of_day};
use crate::types::RepeatData;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

/// A month-step recurrence of `count` months
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthStep {
    pub count: u32,
}

impl MonthStep {
    /// Parse the step count from the numeric prefix of a tag payload
    ///
    /// Accepts `"3months"`, `"3 months"` and `"1 month"`.
    pub fn parse(time: &str) -> Result<Self> {
        let lowered = time.trim().to_lowercase();
        let prefix = lowered
            .strip_suffix("months")
            .or_else(|| lowered.strip_suffix("month"))
            .unwrap_or(&lowered)
            .trim();

        let count: i64 = prefix.parse().map_err(|_| {
            RecurrenceError::InvalidMonthStep(format!("'{}' has no integer step count", time))
        })?;
        if count <= 0 {
            return Err(RecurrenceError::InvalidMonthStep(format!(
                "Step count must be positive, got {}",
                count
            )));
        }
        let count = u32::try_from(count).map_err(|_| {
            RecurrenceError::InvalidMonthStep(format!("Step count {} is too large", count))
        })?;

        Ok(Self { count })
    }

    /// Read the step from a month-type tag
    pub fn from_repeat_data(data: &RepeatData) -> Result<Self> {
        if !data.is_month_type() {
            return Err(RecurrenceError::InvalidMonthStep(format!(
                "Tag '{}' is not a month step",
                String::from(data.kind.clone())
            )));
        }
        Self::parse(&data.time)
    }

    /// First valid calendar date `k * count` months after `last_run`, for the smallest k
    ///
    /// The calendar day and time of day are read in `tz` (UTC when absent).
    /// Fails with [`RecurrenceError::MonthStepExhausted`] when no valid date
    /// is found within `max_attempts` steps.
    pub fn next_after(
        &self,
        last_run: DateTime<Utc>,
        tz: Option<&Tz>,
        max_attempts: u32,
    ) -> Result<DateTime<Utc>> {
        let zone = tz.copied().unwrap_or(Tz::UTC);
        let local = last_run.with_timezone(&zone);
        let year = i64::from(local.year());
        let month0 = i64::from(local.month0());
        let day = local.day();
        let time = time_of_day(last_run, &zone);

        for attempt in 1..=max_attempts {
            let Some(offset) = i64::from(self.count).checked_mul(i64::from(attempt)) else {
                break;
            };
            let total = month0 + offset;
            let candidate_year = year + total / 12;
            let candidate_month = (total % 12 + 1) as u32;

            let date = i32::try_from(candidate_year)
                .ok()
                .and_then(|y| NaiveDate::from_ymd_opt(y, candidate_month, day));

            match date {
                Some(date) => {
                    return resolve_local(&zone, date.and_time(time)).ok_or_else(|| {
                        RecurrenceError::OutOfRange(format!("{} {} in {}", date, time, zone.name()))
                    });
                }
                None => {
                    tracing::trace!(
                        "Month step {} skipped invalid date {}-{:02}-{:02}",
                        attempt,
                        candidate_year,
                        candidate_month,
                        day
                    );
                }
            }
        }

        Err(RecurrenceError::MonthStepExhausted {
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_step_count() {
        assert_eq!(MonthStep::parse("3months").unwrap().count, 3);
        assert_eq!(MonthStep::parse("3 months").unwrap().count, 3);
        assert_eq!(MonthStep::parse("1 Month").unwrap().count, 1);
        assert_eq!(MonthStep::parse("12").unwrap().count, 12);
    }

    #[test]
    fn test_parse_invalid_step_count() {
        for input in ["", "months", "0months", "-2months", "2.5months", "abcmonths"] {
            assert!(
                matches!(
                    MonthStep::parse(input),
                    Err(RecurrenceError::InvalidMonthStep(_))
                ),
                "expected failure for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_from_repeat_data() {
        let step = MonthStep::from_repeat_data(&RepeatData::months(6)).unwrap();
        assert_eq!(step.count, 6);

        let weeks = RepeatData {
            kind: "weeks".to_string().into(),
            time: "2".to_string(),
        };
        assert!(MonthStep::from_repeat_data(&weeks).is_err());
    }

    #[test]
    fn test_skips_short_month() {
        let last_run = Utc.with_ymd_and_hms(2021, 1, 31, 10, 15, 0).unwrap();
        let next = MonthStep { count: 1 }.next_after(last_run, None, 100).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2021, 3, 31, 10, 15, 0).unwrap());
    }

    #[test]
    fn test_step_wraps_year_once() {
        let last_run = Utc.with_ymd_and_hms(2021, 1, 15, 8, 0, 0).unwrap();
        let next = MonthStep { count: 13 }.next_after(last_run, None, 100).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2022, 2, 15, 8, 0, 0).unwrap());

        let last_run = Utc.with_ymd_and_hms(2021, 11, 15, 8, 0, 0).unwrap();
        let next = MonthStep { count: 3 }.next_after(last_run, None, 100).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2022, 2, 15, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_quarterly_from_month_end() {
        // Feb 30 does not exist, May 30 does
        let last_run = Utc.with_ymd_and_hms(2021, 11, 30, 0, 0, 0).unwrap();
        let next = MonthStep { count: 3 }.next_after(last_run, None, 100).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2022, 5, 30, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_leap_day_yearly() {
        let last_run = Utc.with_ymd_and_hms(2020, 2, 29, 12, 0, 0).unwrap();
        let next = MonthStep { count: 12 }.next_after(last_run, None, 100).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_uses_local_calendar() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // Jan 31 23:00 EST
        let last_run = Utc.with_ymd_and_hms(2021, 2, 1, 4, 0, 0).unwrap();
        let next = MonthStep { count: 1 }
            .next_after(last_run, Some(&tz), 100)
            .unwrap();
        // Mar 31 23:00 EDT
        assert_eq!(next, Utc.with_ymd_and_hms(2021, 4, 1, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_exhausted_bound() {
        let last_run = Utc.with_ymd_and_hms(2021, 1, 31, 0, 0, 0).unwrap();
        let result = MonthStep { count: 1 }.next_after(last_run, None, 1);
        assert!(matches!(
            result,
            Err(RecurrenceError::MonthStepExhausted { attempts: 1 })
        ));
    }

    #[test]
    fn test_exhausted_out_of_range_years() {
        let last_run = Utc.with_ymd_and_hms(2021, 1, 15, 0, 0, 0).unwrap();
        let result = MonthStep { count: u32::MAX }.next_after(last_run, None, 100);
        assert!(matches!(
            result,
            Err(RecurrenceError::MonthStepExhausted { attempts: 100 })
        ));
    }
}
