//! Enumerations and shared vocabulary for the checklist engine.
//!
//! This module defines the recurrence-code vocabulary, the resolved status
//! values, and the fixed time constants the scheduling rules share.

use std::fmt;

use chrono::{NaiveTime, Weekday};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Resolved display status of a task instance on a viewing date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    NotVisible,
    NotDueYet,
    DueToday,
    Overdue,
    Missed,
    Completed,
}

impl Status {
    /// Severity used when combining results across recurrence codes.
    /// `Completed` short-circuits before ranking ever happens.
    pub fn severity(self) -> u8 {
        match self {
            Status::NotVisible => 0,
            Status::NotDueYet => 1,
            Status::DueToday => 2,
            Status::Overdue => 3,
            Status::Missed => 4,
            Status::Completed => 5,
        }
    }
}

/// Format a status for table display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::NotVisible => "Not visible",
        Status::NotDueYet => "Not due yet",
        Status::DueToday => "Due today",
        Status::Overdue => "Overdue",
        Status::Missed => "Missed",
        Status::Completed => "Completed",
    }
}

/// Deadline within the due date when a task does not set its own.
pub fn default_due_time() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).unwrap()
}

/// Moment after which an incomplete instance locks into `Missed`.
pub fn lock_time() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap()
}

/// One recurrence code from the task-configuration vocabulary.
///
/// Tasks store their codes as raw strings so unknown values survive
/// round-trips; this enum is the parsed view the rule engine works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    OnceOff,
    OnceOffSticky,
    EveryDay,
    OnceWeekly,
    /// `monday` … `saturday`. Sunday is not part of the vocabulary.
    Weekday(Weekday),
    OnceMonthly,
    /// `start_of_every_month`, or `start_of_month_<mon>` for one month only.
    StartOfMonth(Option<u32>),
    /// `end_of_every_month`, or `end_of_month_<mon>` for one month only.
    EndOfMonth(Option<u32>),
}

impl Recurrence {
    /// Parse a configured code. Returns `None` for anything outside the
    /// vocabulary; callers fall back to the single-day cutoff.
    pub fn parse(code: &str) -> Option<Recurrence> {
        let code = code.trim().to_lowercase();
        let parsed = match code.as_str() {
            "once_off" => Recurrence::OnceOff,
            "once_off_sticky" => Recurrence::OnceOffSticky,
            "every_day" => Recurrence::EveryDay,
            "once_weekly" => Recurrence::OnceWeekly,
            "monday" => Recurrence::Weekday(Weekday::Mon),
            "tuesday" => Recurrence::Weekday(Weekday::Tue),
            "wednesday" => Recurrence::Weekday(Weekday::Wed),
            "thursday" => Recurrence::Weekday(Weekday::Thu),
            "friday" => Recurrence::Weekday(Weekday::Fri),
            "saturday" => Recurrence::Weekday(Weekday::Sat),
            "once_monthly" => Recurrence::OnceMonthly,
            "start_of_every_month" => Recurrence::StartOfMonth(None),
            "end_of_every_month" => Recurrence::EndOfMonth(None),
            _ => {
                if let Some(rest) = code.strip_prefix("start_of_month_") {
                    return parse_month(rest).map(|m| Recurrence::StartOfMonth(Some(m)));
                }
                if let Some(rest) = code.strip_prefix("end_of_month_") {
                    return parse_month(rest).map(|m| Recurrence::EndOfMonth(Some(m)));
                }
                return None;
            }
        };
        Some(parsed)
    }

    /// Fixed display-priority rank; lower sorts first.
    ///
    /// Order: once-off, daily, weekly, specific weekdays by day name,
    /// once-monthly, start-of-month variants, end-of-month variants.
    pub fn rank(self) -> u8 {
        match self {
            Recurrence::OnceOff => 0,
            Recurrence::OnceOffSticky => 1,
            Recurrence::EveryDay => 2,
            Recurrence::OnceWeekly => 3,
            Recurrence::Weekday(d) => 4 + d.num_days_from_monday() as u8,
            Recurrence::OnceMonthly => 10,
            Recurrence::StartOfMonth(None) => 11,
            Recurrence::StartOfMonth(Some(m)) => 11 + m as u8,
            Recurrence::EndOfMonth(None) => 24,
            Recurrence::EndOfMonth(Some(m)) => 24 + m as u8,
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::OnceOff => write!(f, "once_off"),
            Recurrence::OnceOffSticky => write!(f, "once_off_sticky"),
            Recurrence::EveryDay => write!(f, "every_day"),
            Recurrence::OnceWeekly => write!(f, "once_weekly"),
            Recurrence::Weekday(Weekday::Mon) => write!(f, "monday"),
            Recurrence::Weekday(Weekday::Tue) => write!(f, "tuesday"),
            Recurrence::Weekday(Weekday::Wed) => write!(f, "wednesday"),
            Recurrence::Weekday(Weekday::Thu) => write!(f, "thursday"),
            Recurrence::Weekday(Weekday::Fri) => write!(f, "friday"),
            Recurrence::Weekday(Weekday::Sat) => write!(f, "saturday"),
            Recurrence::Weekday(Weekday::Sun) => write!(f, "sunday"),
            Recurrence::OnceMonthly => write!(f, "once_monthly"),
            Recurrence::StartOfMonth(None) => write!(f, "start_of_every_month"),
            Recurrence::StartOfMonth(Some(m)) => write!(f, "start_of_month_{}", month_name(*m)),
            Recurrence::EndOfMonth(None) => write!(f, "end_of_every_month"),
            Recurrence::EndOfMonth(Some(m)) => write!(f, "end_of_month_{}", month_name(*m)),
        }
    }
}

fn parse_month(s: &str) -> Option<u32> {
    let m = match s {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(m)
}

fn month_name(m: u32) -> &'static str {
    match m {
        1 => "jan",
        2 => "feb",
        3 => "mar",
        4 => "apr",
        5 => "may",
        6 => "jun",
        7 => "jul",
        8 => "aug",
        9 => "sep",
        10 => "oct",
        11 => "nov",
        _ => "dec",
    }
}
