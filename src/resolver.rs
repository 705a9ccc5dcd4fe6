//! Interval resolution
//!
//! `repeatInterval` strings are syntactically ambiguous, so resolution
//! tries each grammar in a fixed order and takes the first success:
//!
//! 1. **Month step**: only when the job is tagged as a month step
//! 2. **Cron**: next fire time after the last run
//! 3. **Human interval**: last run plus a fixed duration
//!
//! A failure in one strategy falls through to the next; the last failure
//! is reported when none succeeds.

use crate::config::ResolverConfig;
use crate::cron::CronExpression;
use crate::error::{RecurrenceError, Result};
use crate::interval::HumanInterval;
use crate::month_step::MonthStep;
use crate::timezone::{add_local_days, normalize};
use crate::types::RecurrenceSpec;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Inputs shared by every strategy during one computation
#[derive(Debug, Clone)]
pub struct IntervalContext<'a> {
    /// The job's recurrence attributes
    pub spec: &'a RecurrenceSpec,
    /// Parsed `repeatTimezone`
    pub tz: Option<Tz>,
    /// Instant captured once for this computation
    pub now: DateTime<Utc>,
    /// Effective last run: `lastRunAt`, else `startTime`, else `now`
    pub reference: DateTime<Utc>,
    /// Resolution bounds
    pub config: &'a ResolverConfig,
}

impl<'a> IntervalContext<'a> {
    pub fn new(
        spec: &'a RecurrenceSpec,
        tz: Option<Tz>,
        now: DateTime<Utc>,
        config: &'a ResolverConfig,
    ) -> Self {
        let reference = spec.last_run_at.or(spec.start_time).unwrap_or(now);
        Self {
            spec,
            tz,
            now,
            reference,
            config,
        }
    }

    /// Source of the wall-clock time of day kept by calendar strategies
    fn wall_clock(&self) -> Option<DateTime<Utc>> {
        self.spec.start_time.or(self.spec.last_run_at)
    }

    /// Pin `candidate` to the job's wall-clock time of day
    fn normalize(&self, candidate: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let wall_clock = self.wall_clock().unwrap_or(candidate);
        normalize(candidate, wall_clock, self.tz.as_ref())
    }
}

/// One grammar for reading `repeatInterval`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalStrategy {
    MonthStep,
    Cron,
    HumanInterval,
}

/// Resolution order; earlier strategies shadow later ones
pub const STRATEGY_ORDER: [IntervalStrategy; 3] = [
    IntervalStrategy::MonthStep,
    IntervalStrategy::Cron,
    IntervalStrategy::HumanInterval,
];

impl IntervalStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            IntervalStrategy::MonthStep => "month-step",
            IntervalStrategy::Cron => "cron",
            IntervalStrategy::HumanInterval => "human-interval",
        }
    }

    /// Month stepping is selected by the job's type tag, never by the string
    pub fn applies(&self, ctx: &IntervalContext<'_>) -> bool {
        match self {
            IntervalStrategy::MonthStep => ctx.spec.is_month_step(),
            IntervalStrategy::Cron | IntervalStrategy::HumanInterval => true,
        }
    }

    pub fn resolve(&self, ctx: &IntervalContext<'_>) -> Result<DateTime<Utc>> {
        match self {
            IntervalStrategy::MonthStep => resolve_month_step(ctx),
            IntervalStrategy::Cron => resolve_cron(ctx),
            IntervalStrategy::HumanInterval => resolve_human_interval(ctx),
        }
    }
}

/// Resolve `repeatInterval` with the first strategy that succeeds
pub fn resolve_interval(ctx: &IntervalContext<'_>) -> Result<DateTime<Utc>> {
    let mut last_error = None;

    for strategy in STRATEGY_ORDER.iter().filter(|s| s.applies(ctx)) {
        match strategy.resolve(ctx) {
            Ok(next) => {
                tracing::debug!(
                    "[{}:{}] resolved [{}] with {} strategy",
                    ctx.spec.name,
                    ctx.spec.id,
                    ctx.spec.repeat_interval,
                    strategy.name()
                );
                return Ok(next);
            }
            Err(e) => {
                tracing::debug!(
                    "[{}:{}] {} strategy rejected [{}]: {}",
                    ctx.spec.name,
                    ctx.spec.id,
                    strategy.name(),
                    ctx.spec.repeat_interval,
                    e
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        RecurrenceError::InvalidInterval(ctx.spec.repeat_interval.clone())
    }))
}

fn resolve_month_step(ctx: &IntervalContext<'_>) -> Result<DateTime<Utc>> {
    let data = ctx.spec.repeat_data.as_ref().ok_or_else(|| {
        RecurrenceError::InvalidMonthStep("Job has no repeat tag".to_string())
    })?;
    let step = MonthStep::from_repeat_data(data)?;
    let candidate = step.next_after(
        ctx.reference,
        ctx.tz.as_ref(),
        ctx.config.max_month_step_attempts,
    )?;
    ctx.normalize(candidate)
}

fn resolve_cron(ctx: &IntervalContext<'_>) -> Result<DateTime<Utc>> {
    let expr = CronExpression::parse(&ctx.spec.repeat_interval)?;
    let zone = ctx.tz.unwrap_or(Tz::UTC);
    let years = ctx.config.cron_search_years;

    // Without a prior run, fire no earlier than the start time and never in the past
    let base = match (ctx.spec.last_run_at, ctx.spec.start_time) {
        (Some(last_run), _) => last_run,
        (None, Some(start)) => start.max(ctx.now),
        (None, None) => ctx.now,
    };

    // The engine is exclusive: the result is always strictly after `base`
    expr.next_within(&base.with_timezone(&zone), years)
        .map(|next| next.with_timezone(&Utc))
        .ok_or_else(|| {
            RecurrenceError::InvalidCron(format!(
                "'{}' does not fire within {} years",
                expr.expression, years
            ))
        })
}

fn resolve_human_interval(ctx: &IntervalContext<'_>) -> Result<DateTime<Utc>> {
    let interval = HumanInterval::parse(&ctx.spec.repeat_interval)?;

    // First occurrence runs at the reference itself
    if ctx.spec.last_run_at.is_none() {
        return Ok(ctx.reference);
    }

    // Whole days step the local calendar and keep the wall-clock time of day
    if interval.is_whole_days() {
        if let Some(tz) = ctx.tz.as_ref() {
            let days = u64::try_from(interval.duration().num_days())
                .map_err(|_| RecurrenceError::OutOfRange(interval.expression.clone()))?;
            let wall_clock = ctx.wall_clock().unwrap_or(ctx.reference);
            return add_local_days(ctx.reference, days, wall_clock, tz);
        }
    }

    ctx.reference
        .checked_add_signed(interval.duration())
        .ok_or_else(|| {
            RecurrenceError::OutOfRange(format!(
                "{} + {}",
                ctx.reference.to_rfc3339(),
                interval.expression
            ))
        })
}
