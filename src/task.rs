//! Task configuration records and completion data.
//!
//! This module defines the `TaskDefinition` struct administrators configure,
//! the per-position `PositionCompletion` record the completion API writes,
//! and the `TaskInstance` pairing the display layer builds per visible date.

use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::default_due_time;

/// Sentinel for `custom_order`: the administrator has not assigned one.
pub const CUSTOM_ORDER_UNSET: u32 = 999_999;

/// Configuration for a recurring or one-off piece of checklist work.
///
/// A task may carry several recurrence codes at once; the resolver evaluates
/// each independently and reports the most severe outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    /// Positions that may complete this task. The first entry drives the
    /// responsibility step of the display ordering.
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Raw recurrence codes as configured; unknown codes are kept verbatim
    /// so a typo can be corrected rather than silently dropped.
    pub recurrence: Vec<String>,
    /// Completion deadline within the due date; 17:00 when absent.
    pub due_time: Option<NaiveTime>,
    /// Explicit due date. Required for once-off codes, ignored otherwise.
    pub due_date: Option<NaiveDate>,
    #[serde(default = "unset_order")]
    pub custom_order: u32,
    /// Hold the task back from display until this date.
    #[serde(default)]
    pub publish_after: Option<NaiveDate>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last date the task may render.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
    /// Latest recorded completion per position. Entries are replaced on a new
    /// completion; expiry is logical and enforced by the resolver.
    #[serde(default)]
    pub completions: Vec<PositionCompletion>,
}

fn unset_order() -> u32 {
    CUSTOM_ORDER_UNSET
}

impl TaskDefinition {
    /// First date the task may render: the latest of its creation date,
    /// publish-after date and explicit start date.
    pub fn visibility_anchor(&self, offset: FixedOffset) -> NaiveDate {
        let created = Utc
            .timestamp_opt(self.created_at_utc, 0)
            .single()
            .map(|ts| ts.with_timezone(&offset).date_naive())
            .unwrap_or(NaiveDate::MIN);
        let mut anchor = created;
        if let Some(p) = self.publish_after {
            anchor = anchor.max(p);
        }
        if let Some(s) = self.start_date {
            anchor = anchor.max(s);
        }
        anchor
    }

    /// Last date the task may render, if bounded.
    pub fn visibility_end(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Due time of day, with the 17:00 default applied.
    pub fn effective_due_time(&self) -> NaiveTime {
        self.due_time.unwrap_or_else(default_due_time)
    }

    /// The stored completion for a position, if any.
    pub fn completion_for(&self, position: &str) -> Option<&PositionCompletion> {
        self.completions.iter().find(|c| c.position == position)
    }
}

/// One position's completion of a task cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionCompletion {
    pub position: String,
    pub completed_by: Option<String>,
    /// Epoch seconds of the completion; absent for legacy records.
    pub completed_at_utc: Option<i64>,
    pub is_completed: bool,
}

impl PositionCompletion {
    /// Civil date of the completion in the fixed timezone, or `fallback`
    /// when no timestamp was recorded.
    pub fn completion_date(&self, offset: FixedOffset, fallback: NaiveDate) -> NaiveDate {
        self.completed_at_utc
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(|ts| ts.with_timezone(&offset).date_naive())
            .unwrap_or(fallback)
    }
}

/// One occurrence of a task pinned to a nominal date, as built by the
/// display layer for each visible date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInstance {
    pub instance_date: NaiveDate,
    #[serde(default)]
    pub completions: Vec<PositionCompletion>,
}
