//! Human-readable interval parser
//!
//! Converts free-text durations to a fixed span of time.
//!
//! ## Supported Formats
//!
//! - Plain numbers are milliseconds: `"5000"`
//! - Quantity and unit pairs: `"3 days"`, `"1.5 hours"`, `"an hour"`
//! - Several pairs joined by spaces, commas or `and`:
//!   `"1 hour and 30 minutes"`, `"2 weeks, 3 days"`
//! - Glued pairs: `"3days"`, `"10minutes"`
//! - Compact forms: `"1h30m"`, `"90s"`

use crate::error::{RecurrenceError, Result};
use chrono::Duration;

const MS_PER_DAY: i64 = 86_400_000;

/// Milliseconds per unit keyword
const UNITS: [(&[&str], f64); 8] = [
    (&["ms", "millisecond", "milliseconds"], 1.0),
    (&["s", "sec", "secs", "second", "seconds"], 1_000.0),
    (&["min", "mins", "minute", "minutes"], 60_000.0),
    (&["h", "hr", "hrs", "hour", "hours"], 3_600_000.0),
    (&["d", "day", "days"], 86_400_000.0),
    (&["w", "wk", "wks", "week", "weeks"], 604_800_000.0),
    (&["month", "months"], 2_628_000_000.0),
    (&["y", "yr", "yrs", "year", "years"], 31_536_000_000.0),
];

const NUMBER_WORDS: [(&str, f64); 29] = [
    ("a", 1.0),
    ("an", 1.0),
    ("one", 1.0),
    ("two", 2.0),
    ("three", 3.0),
    ("four", 4.0),
    ("five", 5.0),
    ("six", 6.0),
    ("seven", 7.0),
    ("eight", 8.0),
    ("nine", 9.0),
    ("ten", 10.0),
    ("eleven", 11.0),
    ("twelve", 12.0),
    ("thirteen", 13.0),
    ("fourteen", 14.0),
    ("fifteen", 15.0),
    ("sixteen", 16.0),
    ("seventeen", 17.0),
    ("eighteen", 18.0),
    ("nineteen", 19.0),
    ("twenty", 20.0),
    ("thirty", 30.0),
    ("forty", 40.0),
    ("fifty", 50.0),
    ("sixty", 60.0),
    ("seventy", 70.0),
    ("eighty", 80.0),
    ("ninety", 90.0),
];

/// A parsed human-readable interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanInterval {
    /// Original interval string
    pub expression: String,
    duration: Duration,
}

impl HumanInterval {
    /// Parse a human-readable interval
    ///
    /// # Examples
    ///
    /// ```
    /// use a3s_recurrence::HumanInterval;
    ///
    /// let interval = HumanInterval::parse("2 days").unwrap();
    /// assert_eq!(interval.duration(), chrono::Duration::days(2));
    ///
    /// let interval = HumanInterval::parse("1 hour and 30 minutes").unwrap();
    /// assert_eq!(interval.duration(), chrono::Duration::minutes(90));
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let text = input.trim().to_lowercase();
        if text.is_empty() {
            return Err(RecurrenceError::InvalidInterval(
                "Interval is empty".to_string(),
            ));
        }

        let millis = if is_numeric(&text) {
            text.parse::<f64>().ok()
        } else {
            parse_phrases(&text)
        };

        let duration = match millis {
            Some(ms) => millis_to_duration(ms, input)?,
            None => {
                let std_duration = humantime::parse_duration(&text).map_err(|e| {
                    RecurrenceError::InvalidInterval(format!(
                        "Could not parse '{}' as an interval: {}",
                        input, e
                    ))
                })?;
                Duration::from_std(std_duration).map_err(|_| {
                    RecurrenceError::OutOfRange(format!("Interval '{}' is too large", input))
                })?
            }
        };

        if duration <= Duration::zero() {
            return Err(RecurrenceError::InvalidInterval(format!(
                "Interval '{}' must be longer than zero",
                input
            )));
        }

        Ok(Self {
            expression: input.to_string(),
            duration,
        })
    }

    /// The parsed span of time
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Whether the span is a whole number of days
    pub fn is_whole_days(&self) -> bool {
        self.duration.num_milliseconds() % MS_PER_DAY == 0
    }
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|c| c.is_ascii_digit() || c == '.')
        && token.chars().any(|c| c.is_ascii_digit())
}

fn millis_to_duration(ms: f64, input: &str) -> Result<Duration> {
    if !ms.is_finite() || ms.round() >= i64::MAX as f64 {
        return Err(RecurrenceError::OutOfRange(format!(
            "Interval '{}' is too large",
            input
        )));
    }
    Duration::try_milliseconds(ms.round() as i64).ok_or_else(|| {
        RecurrenceError::OutOfRange(format!("Interval '{}' is too large", input))
    })
}

/// Split into tokens, separating glued quantities from units ("3days")
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();

    for word in text.split(|c: char| c.is_whitespace() || c == ',') {
        if word.is_empty() {
            continue;
        }
        let split = word
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .filter(|&idx| idx > 0);
        match split {
            Some(idx) => {
                tokens.push(&word[..idx]);
                tokens.push(&word[idx..]);
            }
            None => tokens.push(word),
        }
    }

    tokens
}

fn quantity(token: &str) -> Option<f64> {
    if is_numeric(token) {
        return token.parse().ok();
    }
    NUMBER_WORDS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, value)| *value)
}

fn unit_millis(token: &str) -> Option<f64> {
    UNITS
        .iter()
        .find(|(names, _)| names.contains(&token))
        .map(|(_, ms)| *ms)
}

/// Sum `<quantity> <unit>` pairs; `None` when the text has any other shape
fn parse_phrases(text: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut pending: Option<f64> = None;
    let mut matched = false;

    for token in tokenize(text) {
        if token == "and" && pending.is_none() {
            continue;
        }

        if let Some(unit) = unit_millis(token) {
            total += pending.take()? * unit;
            matched = true;
            continue;
        }

        let value = quantity(token)?;
        if pending.replace(value).is_some() {
            return None;
        }
    }

    if pending.is_some() || !matched {
        return None;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(input: &str) -> i64 {
        HumanInterval::parse(input)
            .unwrap()
            .duration()
            .num_milliseconds()
    }

    #[test]
    fn test_single_units() {
        assert_eq!(millis("2 days"), 2 * MS_PER_DAY);
        assert_eq!(millis("3 hours"), 3 * 3_600_000);
        assert_eq!(millis("1 minute"), 60_000);
        assert_eq!(millis("45 seconds"), 45_000);
        assert_eq!(millis("2 weeks"), 14 * MS_PER_DAY);
        assert_eq!(millis("1 year"), 365 * MS_PER_DAY);
    }

    #[test]
    fn test_month_unit() {
        assert_eq!(millis("1 month"), 2_628_000_000);
    }

    #[test]
    fn test_plain_number_is_millis() {
        assert_eq!(millis("5000"), 5_000);
    }

    #[test]
    fn test_number_words() {
        assert_eq!(millis("one minute"), 60_000);
        assert_eq!(millis("an hour"), 3_600_000);
        assert_eq!(millis("twelve hours"), 12 * 3_600_000);
    }

    #[test]
    fn test_compound() {
        assert_eq!(millis("1 hour and 30 minutes"), 90 * 60_000);
        assert_eq!(millis("2 weeks, 3 days"), 17 * MS_PER_DAY);
        assert_eq!(millis("1 day 2 hours"), MS_PER_DAY + 2 * 3_600_000);
    }

    #[test]
    fn test_decimals_and_glued() {
        assert_eq!(millis("1.5 hours"), 90 * 60_000);
        assert_eq!(millis("3days"), 3 * MS_PER_DAY);
        assert_eq!(millis("10minutes"), 600_000);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(millis("2 DAYS"), 2 * MS_PER_DAY);
    }

    #[test]
    fn test_compact_fallback() {
        assert_eq!(millis("1h30m"), 90 * 60_000);
        assert_eq!(millis("90s"), 90_000);
    }

    #[test]
    fn test_whole_days() {
        assert!(HumanInterval::parse("2 days").unwrap().is_whole_days());
        assert!(HumanInterval::parse("1 week").unwrap().is_whole_days());
        assert!(!HumanInterval::parse("36 hours").unwrap().is_whole_days());
        assert!(!HumanInterval::parse("1 month").unwrap().is_whole_days());
    }

    #[test]
    fn test_invalid() {
        assert!(HumanInterval::parse("").is_err());
        assert!(HumanInterval::parse("whenever").is_err());
        assert!(HumanInterval::parse("days").is_err());
        assert!(HumanInterval::parse("3 4 days").is_err());
        assert!(HumanInterval::parse("3 fortnights").is_err());
        assert!(HumanInterval::parse("*/5 * * * *").is_err());
        assert!(HumanInterval::parse("nan").is_err());
    }

    #[test]
    fn test_zero_is_rejected() {
        assert!(matches!(
            HumanInterval::parse("0 days"),
            Err(RecurrenceError::InvalidInterval(_))
        ));
        assert!(HumanInterval::parse("0").is_err());
    }

    #[test]
    fn test_too_large() {
        assert!(matches!(
            HumanInterval::parse("99999999999999999999 years"),
            Err(RecurrenceError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("3days, 2 hours"), vec!["3", "days", "2", "hours"]);
        assert_eq!(tokenize("1h30m"), vec!["1", "h30m"]);
    }
}
