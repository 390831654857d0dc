//! Status resolution: visibility, carry-over and the five-state rules.
//!
//! `resolve` is a pure function of the task configuration, the calendar,
//! the as-of moment and the viewing date. It never reads a clock and never
//! mutates the records it is given; a stale completion is simply ignored
//! and the task re-resolves as a fresh cycle anchored at the viewing date.

use chrono::{NaiveDate, NaiveDateTime};

use crate::calendar::Calendar;
use crate::cutoff::{self, FrequencyCutoff};
use crate::fields::Status;
use crate::task::{PositionCompletion, TaskDefinition};

/// Resolve the display status of `task` on `viewing`, as seen at `as_of`.
///
/// `completion` is the record for the position (or view) being rendered;
/// pass `None` to resolve the task as uncompleted. With several recurrence
/// codes the most severe per-code outcome wins.
pub fn resolve(
    task: &TaskDefinition,
    cal: &Calendar,
    as_of: NaiveDateTime,
    viewing: NaiveDate,
    completion: Option<&PositionCompletion>,
) -> Status {
    // The visibility window gates everything, completed or not.
    if viewing < task.visibility_anchor(cal.utc_offset()) {
        return Status::NotVisible;
    }
    if let Some(end) = task.visibility_end() {
        if viewing > end {
            return Status::NotVisible;
        }
    }

    if let Some(c) = completion.filter(|c| c.is_completed) {
        let completed_on = c.completion_date(cal.utc_offset(), viewing);
        if viewing >= completed_on && completion_carries(task, cal, completed_on, viewing) {
            return Status::Completed;
        }
        // Stale completion: the cycle has lapsed, resolve as a fresh one.
    }

    if task.recurrence.is_empty() {
        // Defensive default for misconfigured tasks; hiding them would bury
        // the configuration mistake.
        return Status::DueToday;
    }

    let mut worst = Status::NotVisible;
    for code in &task.recurrence {
        let cut = cutoff::compute(cal, viewing, code, task.due_date, task.due_time);
        let status = resolve_cutoff(&cut, as_of, viewing);
        if status.severity() > worst.severity() {
            worst = status;
        }
    }
    worst
}

/// Whether a completion made on `completed_on` still displays as completed
/// on `viewing`, under any of the task's recurrence codes.
fn completion_carries(
    task: &TaskDefinition,
    cal: &Calendar,
    completed_on: NaiveDate,
    viewing: NaiveDate,
) -> bool {
    if task.recurrence.is_empty() {
        return viewing == completed_on;
    }
    task.recurrence.iter().any(|code| {
        let cut = cutoff::compute(cal, completed_on, code, task.due_date, task.due_time);
        match cut.carry_end {
            None => true,
            Some(end) => viewing <= end,
        }
    })
}

/// The five-state rules for a single recurrence cutoff, uncompleted path.
fn resolve_cutoff(cut: &FrequencyCutoff, as_of: NaiveDateTime, viewing: NaiveDate) -> Status {
    if viewing < cut.appearance {
        return Status::NotDueYet;
    }
    if viewing == cut.due_date {
        let today = as_of.date();
        if viewing == today {
            if let Some(lock) = cut.lock_moment() {
                if as_of >= lock {
                    return Status::Missed;
                }
            }
            if as_of >= cut.due_moment() {
                return Status::Overdue;
            }
            return Status::DueToday;
        }
        // Remote vantage: a future due date has not opened yet, a past one
        // was due all day.
        return if viewing > today {
            Status::NotDueYet
        } else {
            Status::DueToday
        };
    }
    if viewing > cut.due_date {
        return match cut.lock_date {
            Some(lock) if viewing > lock => Status::Missed,
            _ => Status::Overdue,
        };
    }
    // Visible but not yet at the due date.
    Status::NotDueYet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::CUSTOM_ORDER_UNSET;
    use chrono::{FixedOffset, NaiveTime};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn at(date: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        date.and_hms_opt(h, min, 0).unwrap()
    }

    fn cal(holidays: &[NaiveDate]) -> Calendar {
        let mut cal = Calendar::new(FixedOffset::east_opt(0).unwrap());
        cal.load_year(2023, []);
        cal.load_year(2024, holidays.iter().copied());
        cal.load_year(2025, []);
        cal
    }

    fn task(codes: &[&str]) -> TaskDefinition {
        TaskDefinition {
            id: 1,
            title: "Controlled drugs register check".into(),
            description: None,
            responsibilities: vec!["dispensary".into()],
            categories: vec![],
            recurrence: codes.iter().map(|c| c.to_string()).collect(),
            due_time: None,
            due_date: None,
            custom_order: CUSTOM_ORDER_UNSET,
            publish_after: None,
            start_date: None,
            end_date: None,
            created_at_utc: 0,
            updated_at_utc: 0,
            completions: vec![],
        }
    }

    fn done_at(moment: NaiveDateTime) -> PositionCompletion {
        PositionCompletion {
            position: "dispensary".into(),
            completed_by: Some("jb".into()),
            completed_at_utc: Some(moment.and_utc().timestamp()),
            is_completed: true,
        }
    }

    #[test]
    fn test_daily_completed_today_reopens_tomorrow() {
        let cal = cal(&[]);
        let mut task = task(&["every_day"]);
        task.due_time = NaiveTime::from_hms_opt(9, 0, 0);
        let completion = done_at(at(d(2024, 6, 5), 8, 0));
        let as_of = at(d(2024, 6, 5), 8, 30);

        assert_eq!(
            resolve(&task, &cal, as_of, d(2024, 6, 5), Some(&completion)),
            Status::Completed
        );
        // The next day is a fresh cycle that has not opened yet.
        assert_eq!(
            resolve(&task, &cal, as_of, d(2024, 6, 6), Some(&completion)),
            Status::NotDueYet
        );
    }

    #[test]
    fn test_daily_due_time_ladder_on_the_day() {
        let cal = cal(&[]);
        let mut task = task(&["every_day"]);
        task.due_time = NaiveTime::from_hms_opt(9, 0, 0);
        let viewing = d(2024, 6, 5);

        assert_eq!(resolve(&task, &cal, at(viewing, 8, 30), viewing, None), Status::DueToday);
        assert_eq!(resolve(&task, &cal, at(viewing, 9, 0), viewing, None), Status::Overdue);
        assert_eq!(resolve(&task, &cal, at(viewing, 23, 59), viewing, None), Status::Missed);
    }

    #[test]
    fn test_past_and_future_vantage_on_the_due_date() {
        let cal = cal(&[]);
        let task = task(&["every_day"]);
        let as_of = at(d(2024, 6, 5), 12, 0);
        // Yesterday's instance was due all day; tomorrow's has not opened.
        assert_eq!(resolve(&task, &cal, as_of, d(2024, 6, 4), None), Status::DueToday);
        assert_eq!(resolve(&task, &cal, as_of, d(2024, 6, 6), None), Status::NotDueYet);
    }

    #[test]
    fn test_monday_holiday_shifts_the_cycle_forward() {
        let cal = cal(&[d(2024, 6, 3)]);
        let task = task(&["monday"]);
        let as_of = at(d(2024, 6, 3), 10, 0);
        // The original Monday shows nothing due yet; Tuesday carries the work.
        assert_eq!(resolve(&task, &cal, as_of, d(2024, 6, 3), None), Status::NotDueYet);
        assert_eq!(
            resolve(&task, &cal, at(d(2024, 6, 4), 10, 0), d(2024, 6, 4), None),
            Status::DueToday
        );
    }

    #[test]
    fn test_weekday_overdue_until_week_lock_then_missed() {
        let cal = cal(&[]);
        let task = task(&["monday"]);
        let as_of = at(d(2024, 6, 9), 12, 0);
        // Monday 2024-06-03 was due; Wednesday it is overdue, Sunday after
        // the Saturday lock it is missed.
        assert_eq!(resolve(&task, &cal, as_of, d(2024, 6, 5), None), Status::Overdue);
        assert_eq!(resolve(&task, &cal, as_of, d(2024, 6, 9), None), Status::Missed);
    }

    #[test]
    fn test_once_off_overdue_forever_never_missed() {
        let cal = cal(&[]);
        let mut task = task(&["once_off"]);
        task.due_date = Some(d(2024, 1, 15));
        let as_of = at(d(2024, 12, 31), 12, 0);
        assert_eq!(resolve(&task, &cal, as_of, d(2024, 12, 31), None), Status::Overdue);
    }

    #[test]
    fn test_once_off_completion_carries_indefinitely() {
        let cal = cal(&[]);
        let mut task = task(&["once_off"]);
        task.due_date = Some(d(2024, 1, 15));
        let completion = done_at(at(d(2024, 1, 20), 11, 0));
        let as_of = at(d(2024, 12, 31), 12, 0);
        assert_eq!(
            resolve(&task, &cal, as_of, d(2024, 12, 31), Some(&completion)),
            Status::Completed
        );
    }

    #[test]
    fn test_weekly_carry_round_trip() {
        let cal = cal(&[]);
        let task = task(&["once_weekly"]);
        // Completed Tuesday 2024-06-04; the week locks Saturday 2024-06-08.
        let completion = done_at(at(d(2024, 6, 4), 14, 0));
        let as_of = at(d(2024, 6, 4), 15, 0);

        for day in 4..=8 {
            assert_eq!(
                resolve(&task, &cal, as_of, d(2024, 6, day), Some(&completion)),
                Status::Completed,
                "2024-06-{day:02}"
            );
        }
        // Monday of the next week reopens as a fresh cycle whose due date
        // is the following Saturday.
        assert_eq!(
            resolve(&task, &cal, as_of, d(2024, 6, 10), Some(&completion)),
            Status::NotDueYet
        );
    }

    #[test]
    fn test_completion_before_viewing_window_does_not_apply() {
        let cal = cal(&[]);
        let task = task(&["once_weekly"]);
        let completion = done_at(at(d(2024, 6, 4), 14, 0));
        let as_of = at(d(2024, 6, 4), 15, 0);
        // Viewing the Monday before the completion was made.
        assert_eq!(
            resolve(&task, &cal, as_of, d(2024, 6, 3), Some(&completion)),
            Status::NotDueYet
        );
    }

    #[test]
    fn test_completion_without_timestamp_falls_back_to_viewing_date() {
        let cal = cal(&[]);
        let task = task(&["every_day"]);
        let completion = PositionCompletion {
            position: "dispensary".into(),
            completed_by: None,
            completed_at_utc: None,
            is_completed: true,
        };
        let as_of = at(d(2024, 6, 5), 12, 0);
        assert_eq!(
            resolve(&task, &cal, as_of, d(2024, 6, 5), Some(&completion)),
            Status::Completed
        );
    }

    #[test]
    fn test_multiple_codes_take_the_most_severe() {
        let cal = cal(&[]);
        // Monday work is overdue mid-week while the monthly window is still
        // open; the overdue result wins.
        let task = task(&["monday", "once_monthly"]);
        let as_of = at(d(2024, 6, 5), 12, 0);
        assert_eq!(resolve(&task, &cal, as_of, d(2024, 6, 5), None), Status::Overdue);
    }

    #[test]
    fn test_visibility_window_trumps_everything() {
        let cal = cal(&[]);
        let mut task = task(&["every_day"]);
        task.publish_after = Some(d(2024, 6, 10));
        task.end_date = Some(d(2024, 6, 20));
        let completion = done_at(at(d(2024, 6, 21), 9, 0));
        let as_of = at(d(2024, 6, 5), 12, 0);

        assert_eq!(resolve(&task, &cal, as_of, d(2024, 6, 5), None), Status::NotVisible);
        assert_eq!(
            resolve(&task, &cal, at(d(2024, 6, 21), 10, 0), d(2024, 6, 21), Some(&completion)),
            Status::NotVisible
        );
        assert_eq!(
            resolve(&task, &cal, at(d(2024, 6, 15), 10, 0), d(2024, 6, 15), None),
            Status::DueToday
        );
    }

    #[test]
    fn test_empty_recurrence_defaults_to_due_today() {
        let cal = cal(&[]);
        let task = task(&[]);
        let as_of = at(d(2024, 6, 5), 12, 0);
        assert_eq!(resolve(&task, &cal, as_of, d(2024, 6, 5), None), Status::DueToday);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let cal = cal(&[d(2024, 6, 3)]);
        let task = task(&["monday", "once_monthly"]);
        let as_of = at(d(2024, 6, 5), 12, 0);
        let first = resolve(&task, &cal, as_of, d(2024, 6, 5), None);
        let second = resolve(&task, &cal, as_of, d(2024, 6, 5), None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_monthly_between_appearance_and_due_is_not_due_yet() {
        let cal = cal(&[]);
        let task = task(&["once_monthly"]);
        let as_of = at(d(2024, 6, 12), 12, 0);
        assert_eq!(resolve(&task, &cal, as_of, d(2024, 6, 12), None), Status::NotDueYet);
    }
}
