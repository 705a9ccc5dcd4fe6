//! Wall-clock realignment in a named timezone
//!
//! Interval math happens on calendar days; the job's intended run time
//! stays pinned to a reference time of day. [`normalize`] recombines the
//! two in the job's timezone.

use crate::error::{RecurrenceError, Result};
use chrono::{
    DateTime, Days, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

/// Parse an IANA timezone name; an empty name means "no timezone"
pub fn parse_timezone(name: &str) -> Result<Option<Tz>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    name.parse::<Tz>()
        .map(Some)
        .map_err(|_| RecurrenceError::InvalidTimezone(name.to_string()))
}

/// Resolve a local wall-clock time to an instant
///
/// Ambiguous local times (DST fall-back) take the earlier instant. Local
/// times inside a DST gap move forward by one hour.
pub fn resolve_local<Z: TimeZone>(tz: &Z, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            let shifted = local.checked_add_signed(Duration::hours(1))?;
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        }
    }
}

/// Time of day of `instant` in `tz`, truncated to whole seconds
pub fn time_of_day<Z: TimeZone>(instant: DateTime<Utc>, tz: &Z) -> NaiveTime {
    let time = instant.with_timezone(tz).time();
    time.with_nanosecond(0).unwrap_or(time)
}

/// Put `reference`'s time of day on `candidate`'s calendar day, both read in `tz`
///
/// Without a timezone the candidate is returned unmodified.
pub fn normalize(
    candidate: DateTime<Utc>,
    reference: DateTime<Utc>,
    tz: Option<&Tz>,
) -> Result<DateTime<Utc>> {
    let Some(tz) = tz else {
        return Ok(candidate);
    };

    let day = candidate.with_timezone(tz).date_naive();
    let time = time_of_day(reference, tz);

    resolve_local(tz, day.and_time(time)).ok_or_else(|| {
        RecurrenceError::OutOfRange(format!("{} {} in {}", day, time, tz.name()))
    })
}

/// Step `days` calendar days from `instant`'s local date, at `wall_clock`'s time of day
///
/// Days are counted on the `tz` calendar, so a DST transition never adds
/// or drops a day.
pub fn add_local_days(
    instant: DateTime<Utc>,
    days: u64,
    wall_clock: DateTime<Utc>,
    tz: &Tz,
) -> Result<DateTime<Utc>> {
    let day = instant
        .with_timezone(tz)
        .date_naive()
        .checked_add_days(Days::new(days))
        .ok_or_else(|| {
            RecurrenceError::OutOfRange(format!("{} + {} days", instant.to_rfc3339(), days))
        })?;
    let time = time_of_day(wall_clock, tz);

    resolve_local(tz, day.and_time(time)).ok_or_else(|| {
        RecurrenceError::OutOfRange(format!("{} {} in {}", day, time, tz.name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_york() -> Tz {
        parse_timezone("America/New_York").unwrap().unwrap()
    }

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("").unwrap().is_none());
        assert!(parse_timezone("  ").unwrap().is_none());
        assert_eq!(parse_timezone("Europe/Berlin").unwrap(), Some(Tz::Europe__Berlin));
        assert!(matches!(
            parse_timezone("Mars/Olympus_Mons"),
            Err(RecurrenceError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_normalize_without_timezone() {
        let candidate = Utc.with_ymd_and_hms(2021, 3, 10, 3, 0, 0).unwrap();
        let reference = Utc.with_ymd_and_hms(2021, 1, 1, 14, 30, 0).unwrap();
        assert_eq!(normalize(candidate, reference, None).unwrap(), candidate);
    }

    #[test]
    fn test_normalize_uses_local_calendar_day() {
        let tz = new_york();
        // 03:00Z on Mar 10 is still Mar 9 in New York
        let candidate = Utc.with_ymd_and_hms(2021, 3, 10, 3, 0, 0).unwrap();
        let reference = Utc.with_ymd_and_hms(2021, 1, 1, 14, 30, 0).unwrap();

        let result = normalize(candidate, reference, Some(&tz)).unwrap();
        assert_eq!(result, Utc.with_ymd_and_hms(2021, 3, 9, 14, 30, 0).unwrap());
    }

    #[test]
    fn test_normalize_preserves_wall_clock_across_dst() {
        let tz = new_york();
        // 09:30 EST in January
        let reference = Utc.with_ymd_and_hms(2021, 1, 4, 14, 30, 0).unwrap();
        let candidate = Utc.with_ymd_and_hms(2021, 7, 4, 18, 0, 0).unwrap();

        // 09:30 EDT in July
        let result = normalize(candidate, reference, Some(&tz)).unwrap();
        assert_eq!(result, Utc.with_ymd_and_hms(2021, 7, 4, 13, 30, 0).unwrap());
    }

    #[test]
    fn test_normalize_drops_subsecond_precision() {
        let reference = Utc.with_ymd_and_hms(2021, 1, 4, 14, 30, 15).unwrap()
            + Duration::milliseconds(345);
        let candidate = Utc.with_ymd_and_hms(2021, 1, 9, 12, 0, 0).unwrap();

        let result = normalize(candidate, reference, Some(&Tz::UTC)).unwrap();
        assert_eq!(result, Utc.with_ymd_and_hms(2021, 1, 9, 14, 30, 15).unwrap());
    }

    #[test]
    fn test_resolve_local_gap_moves_forward() {
        let tz = new_york();
        let local = NaiveDate::from_ymd_opt(2021, 3, 14)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        // 03:30 EDT
        assert_eq!(
            resolve_local(&tz, local),
            Some(Utc.with_ymd_and_hms(2021, 3, 14, 7, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_resolve_local_ambiguous_takes_earliest() {
        let tz = new_york();
        let local = NaiveDate::from_ymd_opt(2021, 11, 7)
            .unwrap()
            .and_hms_opt(1, 30, 0)
            .unwrap();
        // 01:30 EDT, not 01:30 EST
        assert_eq!(
            resolve_local(&tz, local),
            Some(Utc.with_ymd_and_hms(2021, 11, 7, 5, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_add_local_days_across_fall_back() {
        let tz = new_york();
        // Nov 7 00:00 EDT; the day is 25 hours long
        let instant = Utc.with_ymd_and_hms(2021, 11, 7, 4, 0, 0).unwrap();
        let next = add_local_days(instant, 1, instant, &tz).unwrap();
        // Nov 8 00:00 EST
        assert_eq!(next, Utc.with_ymd_and_hms(2021, 11, 8, 5, 0, 0).unwrap());
    }

    #[test]
    fn test_add_local_days_across_spring_forward() {
        let tz = new_york();
        // Mar 13 23:30 EST; Mar 14 is 23 hours long
        let instant = Utc.with_ymd_and_hms(2021, 3, 14, 4, 30, 0).unwrap();
        let next = add_local_days(instant, 1, instant, &tz).unwrap();
        // Mar 14 23:30 EDT
        assert_eq!(next, Utc.with_ymd_and_hms(2021, 3, 15, 3, 30, 0).unwrap());
    }

    #[test]
    fn test_add_local_days_uses_wall_clock_time() {
        let tz = new_york();
        let instant = Utc.with_ymd_and_hms(2021, 6, 1, 14, 7, 31).unwrap();
        // 09:00 EST
        let wall_clock = Utc.with_ymd_and_hms(2021, 1, 4, 14, 0, 0).unwrap();
        let next = add_local_days(instant, 2, wall_clock, &tz).unwrap();
        // Jun 3 09:00 EDT
        assert_eq!(next, Utc.with_ymd_and_hms(2021, 6, 3, 13, 0, 0).unwrap());
    }
}
