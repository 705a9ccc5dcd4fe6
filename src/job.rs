//! Job record seam
//!
//! Callers that keep a mutable job record implement [`RecurringJob`] so a
//! [`RecurrenceResult`] can be written back in one step.

use crate::types::{RecurrenceResult, RecurrenceSpec};
use chrono::{DateTime, Utc};

/// A job record that carries recurrence attributes
pub trait RecurringJob {
    /// Snapshot of the job's current recurrence attributes
    fn recurrence(&self) -> RecurrenceSpec;

    /// Store the resolved next run (`None` clears it)
    fn set_next_run_at(&mut self, next_run_at: Option<DateTime<Utc>>);

    /// Record a failure reason on the job
    fn fail(&mut self, reason: &str);
}

impl RecurrenceResult {
    /// Write this result onto a job record
    ///
    /// `nextRunAt` is always overwritten; `fail` is only invoked when a
    /// failure reason is present.
    pub fn apply_to<J: RecurringJob + ?Sized>(&self, job: &mut J) {
        job.set_next_run_at(self.next_run_at);
        if let Some(reason) = self.failure_reason {
            job.fail(reason.as_str());
        }
    }
}
