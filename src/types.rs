//! Core recurrence types
//!
//! All types use camelCase JSON serialization so they line up with stored
//! job documents.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type tag that selects a non-cron interval grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RepeatKind {
    /// Fixed-N-months stepping
    Months,
    /// Any other tag; carries no special meaning for resolution
    Other(String),
}

impl From<String> for RepeatKind {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("months") {
            RepeatKind::Months
        } else {
            RepeatKind::Other(value)
        }
    }
}

impl From<RepeatKind> for String {
    fn from(kind: RepeatKind) -> Self {
        match kind {
            RepeatKind::Months => "months".to_string(),
            RepeatKind::Other(value) => value,
        }
    }
}

/// Discriminated grammar tag attached to a job (`data.repeatData`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatData {
    /// Grammar selector
    #[serde(rename = "type")]
    pub kind: RepeatKind,

    /// Grammar payload, e.g. `"3months"`
    #[serde(default)]
    pub time: String,
}

impl RepeatData {
    /// Tag a job as stepping `count` calendar months at a time
    pub fn months(count: u32) -> Self {
        Self {
            kind: RepeatKind::Months,
            time: format!("{}months", count),
        }
    }

    /// Whether the month-step grammar is selected
    pub fn is_month_type(&self) -> bool {
        self.kind == RepeatKind::Months
    }
}

/// Recurrence attributes of one job, captured for a single computation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceSpec {
    /// Job name (diagnostics only)
    #[serde(default)]
    pub name: String,

    /// Job identifier (diagnostics only)
    #[serde(default)]
    pub id: String,

    /// Cron expression or human-interval string; empty when unused
    #[serde(default)]
    pub repeat_interval: String,

    /// IANA timezone name; empty disables wall-clock normalization
    #[serde(default)]
    pub repeat_timezone: String,

    /// Natural-language daily anchor, e.g. `"3:30pm"`; empty when unused
    #[serde(default)]
    pub repeat_at: String,

    /// When the job last ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,

    /// Configured start; fallback reference and source of the wall-clock time of day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// Grammar tag (month-step selection)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_data: Option<RepeatData>,
}

impl RecurrenceSpec {
    /// Create an empty spec for the named job
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the repeat interval (cron or human interval)
    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.repeat_interval = interval.into();
        self
    }

    /// Set the repeat timezone
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.repeat_timezone = timezone.into();
        self
    }

    /// Set the daily anchor
    pub fn with_repeat_at(mut self, repeat_at: impl Into<String>) -> Self {
        self.repeat_at = repeat_at.into();
        self
    }

    /// Set the last run time
    pub fn with_last_run_at(mut self, last_run_at: DateTime<Utc>) -> Self {
        self.last_run_at = Some(last_run_at);
        self
    }

    /// Set the start time
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Attach a grammar tag
    pub fn with_repeat_data(mut self, repeat_data: RepeatData) -> Self {
        self.repeat_data = Some(repeat_data);
        self
    }

    /// Whether the month-step grammar governs this job
    pub fn is_month_step(&self) -> bool {
        self.repeat_data
            .as_ref()
            .is_some_and(RepeatData::is_month_type)
    }

    /// Build a spec from a stored job document
    ///
    /// Reads `repeatInterval`, `repeatTimezone`, `repeatAt`, `lastRunAt`,
    /// `name`, `_id`, and `data.startTime` / `data.repeatData`.
    pub fn from_job_document(document: &serde_json::Value) -> Result<Self> {
        let doc: JobDocument = serde_json::from_value(document.clone())?;
        let data = doc.data.unwrap_or_default();
        let id = match doc.id {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        Ok(Self {
            name: doc.name,
            id,
            repeat_interval: doc.repeat_interval.unwrap_or_default(),
            repeat_timezone: doc.repeat_timezone.unwrap_or_default(),
            repeat_at: doc.repeat_at.unwrap_or_default(),
            last_run_at: doc.last_run_at,
            start_time: data.start_time,
            repeat_data: data.repeat_data,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobDocument {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "_id")]
    id: serde_json::Value,
    #[serde(default)]
    repeat_interval: Option<String>,
    #[serde(default)]
    repeat_timezone: Option<String>,
    #[serde(default)]
    repeat_at: Option<String>,
    #[serde(default)]
    last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    data: Option<JobData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobData {
    #[serde(default)]
    start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    repeat_data: Option<RepeatData>,
}

/// Why a computation left `nextRunAt` undefined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// No interval grammar could resolve `repeatInterval`
    #[serde(rename = "failed to calculate nextRunAt due to invalid repeat interval")]
    InvalidRepeatInterval,
    /// `repeatAt` could not be read as a time of day
    #[serde(rename = "failed to calculate repeatAt time due to invalid format")]
    InvalidRepeatAt,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidRepeatInterval => {
                "failed to calculate nextRunAt due to invalid repeat interval"
            }
            FailureReason::InvalidRepeatAt => {
                "failed to calculate repeatAt time due to invalid format"
            }
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one next-run computation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceResult {
    /// Resolved next run; `None` when unresolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<DateTime<Utc>>,

    /// Set whenever resolution was attempted and failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
}

impl RecurrenceResult {
    /// A resolved next run
    pub fn scheduled(next_run_at: DateTime<Utc>) -> Self {
        Self {
            next_run_at: Some(next_run_at),
            failure_reason: None,
        }
    }

    /// A failed resolution
    pub fn failed(reason: FailureReason) -> Self {
        Self {
            next_run_at: None,
            failure_reason: Some(reason),
        }
    }

    /// Nothing to compute: neither `repeatInterval` nor `repeatAt` is set
    pub fn unscheduled() -> Self {
        Self::default()
    }

    pub fn is_scheduled(&self) -> bool {
        self.next_run_at.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.failure_reason.is_some()
    }
}
