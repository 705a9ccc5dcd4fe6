//! # a3s-recurrence
//!
//! Next-run computation for recurring jobs.
//!
//! ## Overview
//!
//! Given a job's recurrence attributes and the time it last ran,
//! `a3s-recurrence` resolves the next absolute instant the job must run.
//! Four grammars sit behind one call:
//!
//! - **Cron**: `"*/5 * * * *"`, `"0 30 9 * * MON-FRI"`, `"@daily"`
//! - **Human intervals**: `"3 hours"`, `"2 days"`, `"1 hour and 30 minutes"`
//! - **Month steps**: every N calendar months, keeping the day of month
//! - **Daily anchors**: `"3:30pm"`, `"noon"`, `"tomorrow at 9am"`
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_recurrence::{NextRunCalculator, RecurrenceSpec};
//! use chrono::{TimeZone, Utc};
//!
//! let calculator = NextRunCalculator::default();
//! let last_run = Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 0).unwrap();
//!
//! let spec = RecurrenceSpec::new("sync", "job-42")
//!     .with_interval("*/15 * * * *")
//!     .with_last_run_at(last_run);
//!
//! let result = calculator.compute_at(&spec, last_run);
//! assert_eq!(
//!     result.next_run_at,
//!     Some(Utc.with_ymd_and_hms(2021, 6, 1, 10, 15, 0).unwrap())
//! );
//! ```
//!
//! ## Failure contract
//!
//! Resolution never returns an error. A [`RecurrenceResult`] either holds
//! a next run strictly after the last run, or no next run plus a
//! [`FailureReason`] for the caller to record on the job.

pub mod anchor;
pub mod calculator;
pub mod config;
pub mod cron;
pub mod error;
pub mod interval;
pub mod job;
pub mod month_step;
pub mod resolver;
pub mod timezone;
pub mod types;

// Re-export core types
pub use anchor::Anchor;
pub use calculator::{compute_next_run_at, NextRunCalculator};
pub use config::ResolverConfig;
pub use cron::CronExpression;
pub use error::{RecurrenceError, Result};
pub use interval::HumanInterval;
pub use job::RecurringJob;
pub use month_step::MonthStep;
pub use resolver::{IntervalStrategy, STRATEGY_ORDER};
pub use types::{FailureReason, RecurrenceResult, RecurrenceSpec, RepeatData, RepeatKind};
