//! Next-run computation entry point
//!
//! Picks the grammar by which field is populated (`repeatInterval` wins
//! over `repeatAt`), runs it, and turns every failure into a
//! [`RecurrenceResult`] instead of an error.

use crate::anchor::Anchor;
use crate::config::ResolverConfig;
use crate::error::{RecurrenceError, Result};
use crate::job::RecurringJob;
use crate::resolver::{resolve_interval, IntervalContext};
use crate::timezone::parse_timezone;
use crate::types::{FailureReason, RecurrenceResult, RecurrenceSpec};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Computes next run times for recurring jobs
#[derive(Debug, Clone, Default)]
pub struct NextRunCalculator {
    config: ResolverConfig,
}

impl NextRunCalculator {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Compute the next run, reading the clock once
    pub fn compute(&self, spec: &RecurrenceSpec) -> RecurrenceResult {
        self.compute_at(spec, Utc::now())
    }

    /// Compute the next run with an explicit "now"
    ///
    /// Identical inputs always produce identical results.
    pub fn compute_at(&self, spec: &RecurrenceSpec, now: DateTime<Utc>) -> RecurrenceResult {
        if !spec.repeat_interval.trim().is_empty() {
            tracing::debug!(
                "[{}:{}] computing next run via interval [{}]",
                spec.name,
                spec.id,
                spec.repeat_interval
            );
            finish(
                spec,
                self.from_interval(spec, now),
                FailureReason::InvalidRepeatInterval,
            )
        } else if !spec.repeat_at.trim().is_empty() {
            tracing::debug!(
                "[{}:{}] computing next run via repeatAt [{}]",
                spec.name,
                spec.id,
                spec.repeat_at
            );
            finish(
                spec,
                self.from_repeat_at(spec, now),
                FailureReason::InvalidRepeatAt,
            )
        } else {
            RecurrenceResult::unscheduled()
        }
    }

    /// Compute from a job record and write the outcome back onto it
    pub fn apply<J: RecurringJob + ?Sized>(&self, job: &mut J) -> RecurrenceResult {
        self.apply_at(job, Utc::now())
    }

    /// [`apply`](Self::apply) with an explicit "now"
    pub fn apply_at<J: RecurringJob + ?Sized>(
        &self,
        job: &mut J,
        now: DateTime<Utc>,
    ) -> RecurrenceResult {
        let result = self.compute_at(&job.recurrence(), now);
        result.apply_to(job);
        result
    }

    fn from_interval(&self, spec: &RecurrenceSpec, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let tz = parse_timezone(&spec.repeat_timezone)?;
        let ctx = IntervalContext::new(spec, tz, now, &self.config);
        let next = resolve_interval(&ctx)?;

        if let Some(last_run) = spec.last_run_at {
            if next <= last_run {
                return Err(RecurrenceError::NonAdvancing {
                    next,
                    reference: last_run,
                });
            }
        }
        Ok(next)
    }

    fn from_repeat_at(&self, spec: &RecurrenceSpec, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let anchor = Anchor::parse(&spec.repeat_at)?;
        let tz = parse_timezone(&spec.repeat_timezone)?.unwrap_or(Tz::UTC);
        let reference = spec.last_run_at.unwrap_or(now);
        anchor.next_after(reference, now, &tz)
    }
}

fn finish(
    spec: &RecurrenceSpec,
    outcome: Result<DateTime<Utc>>,
    reason: FailureReason,
) -> RecurrenceResult {
    match outcome {
        Ok(next) => {
            tracing::debug!(
                "[{}:{}] nextRunAt set to [{}]",
                spec.name,
                spec.id,
                next.to_rfc3339()
            );
            RecurrenceResult::scheduled(next)
        }
        Err(e) => {
            tracing::warn!("[{}:{}] {}: {}", spec.name, spec.id, reason, e);
            RecurrenceResult::failed(reason)
        }
    }
}

/// Compute the next run with the default configuration
///
/// # Examples
///
/// ```
/// use a3s_recurrence::{compute_next_run_at, RecurrenceSpec};
/// use chrono::{TimeZone, Utc};
///
/// let last_run = Utc.with_ymd_and_hms(2021, 6, 1, 9, 0, 0).unwrap();
/// let spec = RecurrenceSpec::new("digest", "job-1")
///     .with_interval("2 days")
///     .with_last_run_at(last_run);
///
/// let result = compute_next_run_at(&spec, last_run);
/// assert_eq!(
///     result.next_run_at,
///     Some(Utc.with_ymd_and_hms(2021, 6, 3, 9, 0, 0).unwrap())
/// );
/// ```
pub fn compute_next_run_at(spec: &RecurrenceSpec, now: DateTime<Utc>) -> RecurrenceResult {
    NextRunCalculator::default().compute_at(spec, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_nothing_to_compute() {
        let spec = RecurrenceSpec::new("idle", "1");
        let result = compute_next_run_at(&spec, at(2021, 1, 1, 0, 0, 0));
        assert_eq!(result, RecurrenceResult::unscheduled());
    }

    #[test]
    fn test_interval_takes_precedence() {
        let last = at(2021, 6, 1, 9, 0, 0);
        let spec = RecurrenceSpec::new("both", "1")
            .with_interval("1 hour")
            .with_repeat_at("not a time")
            .with_last_run_at(last);

        let result = compute_next_run_at(&spec, last);
        assert_eq!(result.next_run_at, Some(at(2021, 6, 1, 10, 0, 0)));
        assert!(result.failure_reason.is_none());
    }

    #[test]
    fn test_invalid_interval() {
        let spec = RecurrenceSpec::new("broken", "1")
            .with_interval("sometimes")
            .with_last_run_at(at(2021, 6, 1, 9, 0, 0));

        let result = compute_next_run_at(&spec, at(2021, 6, 1, 9, 0, 0));
        assert_eq!(
            result,
            RecurrenceResult::failed(FailureReason::InvalidRepeatInterval)
        );
    }

    #[test]
    fn test_invalid_timezone_fails_interval() {
        let spec = RecurrenceSpec::new("job", "1")
            .with_interval("1 day")
            .with_timezone("Atlantis/Capital");

        let result = compute_next_run_at(&spec, at(2021, 6, 1, 9, 0, 0));
        assert_eq!(
            result.failure_reason,
            Some(FailureReason::InvalidRepeatInterval)
        );
    }

    #[test]
    fn test_invalid_anchor() {
        let spec = RecurrenceSpec::new("job", "1").with_repeat_at("whenever you like");
        let result = compute_next_run_at(&spec, at(2021, 6, 1, 9, 0, 0));
        assert_eq!(
            result,
            RecurrenceResult::failed(FailureReason::InvalidRepeatAt)
        );
    }

    #[test]
    fn test_anchor_uses_now_without_last_run() {
        let spec = RecurrenceSpec::new("job", "1").with_repeat_at("3:30pm");
        let result = compute_next_run_at(&spec, at(2021, 6, 1, 9, 0, 0));
        assert_eq!(result.next_run_at, Some(at(2021, 6, 1, 15, 30, 0)));
    }

    #[test]
    fn test_compute_is_deterministic() {
        let now = at(2021, 6, 1, 9, 0, 0);
        let calculator = NextRunCalculator::default();
        let spec = RecurrenceSpec::new("job", "1")
            .with_interval("*/10 * * * *")
            .with_last_run_at(now);

        assert_eq!(calculator.compute_at(&spec, now), calculator.compute_at(&spec, now));
    }

    #[test]
    fn test_custom_config_bound() {
        let config = ResolverConfig {
            max_month_step_attempts: 1,
            ..ResolverConfig::default()
        };
        let calculator = NextRunCalculator::new(config);
        // Feb 31 is invalid and one attempt is all we get; the interval string
        // is neither cron nor a human interval
        let spec = RecurrenceSpec::new("job", "1")
            .with_interval("month-step")
            .with_repeat_data(crate::types::RepeatData::months(1))
            .with_last_run_at(at(2021, 1, 31, 0, 0, 0));

        let result = calculator.compute_at(&spec, at(2021, 1, 31, 0, 0, 0));
        assert_eq!(calculator.config().max_month_step_attempts, 1);
        assert_eq!(
            result.failure_reason,
            Some(FailureReason::InvalidRepeatInterval)
        );
    }
}
