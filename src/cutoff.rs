//! Per-recurrence cutoff calculation.
//!
//! Given a nominal anchor date and one recurrence code, `compute` determines
//! when the instance appears, when it is due, when it locks into `Missed`,
//! and how far a completion carries forward. Malformed input never fails:
//! unrecognized codes and missing once-off due dates degrade to a single-day
//! cutoff, with the degradation recorded on the result.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::calendar::Calendar;
use crate::fields::{default_due_time, lock_time, Recurrence};

/// Computed boundaries for one (task, recurrence code) pair.
///
/// `lock_date == None` means the instance never auto-locks and sits
/// `Overdue` until completed; `carry_end == None` means a completion
/// carries forward indefinitely. Both hold for once-off codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyCutoff {
    pub appearance: NaiveDate,
    pub due_date: NaiveDate,
    pub due_time: NaiveTime,
    pub lock_date: Option<NaiveDate>,
    pub lock_time: Option<NaiveTime>,
    pub carry_start: NaiveDate,
    pub carry_end: Option<NaiveDate>,
    /// True when holiday data was missing or the inputs forced a fallback.
    pub degraded: bool,
    pub warnings: Vec<String>,
}

impl FrequencyCutoff {
    /// The instant the instance becomes overdue.
    pub fn due_moment(&self) -> NaiveDateTime {
        self.due_date.and_time(self.due_time)
    }

    /// The instant the instance becomes permanently missed, if it ever does.
    pub fn lock_moment(&self) -> Option<NaiveDateTime> {
        match (self.lock_date, self.lock_time) {
            (Some(date), Some(time)) => Some(date.and_time(time)),
            _ => None,
        }
    }
}

/// Compute the cutoff for one recurrence code anchored at `anchor`.
///
/// `explicit_due_date` is only consulted by once-off codes;
/// `explicit_due_time` applies to every family, defaulting to 17:00.
pub fn compute(
    cal: &Calendar,
    anchor: NaiveDate,
    code: &str,
    explicit_due_date: Option<NaiveDate>,
    explicit_due_time: Option<NaiveTime>,
) -> FrequencyCutoff {
    let due_time = explicit_due_time.unwrap_or_else(default_due_time);

    let Some(rec) = Recurrence::parse(code) else {
        tracing::warn!(code, "unrecognized recurrence code, using single-day cutoff");
        let mut cutoff = single_day(anchor, due_time);
        cutoff.degraded = true;
        cutoff
            .warnings
            .push(format!("unrecognized recurrence code '{code}'"));
        return cutoff;
    };

    let mut cutoff = match rec {
        Recurrence::OnceOff | Recurrence::OnceOffSticky => once_off(anchor, explicit_due_date, due_time),
        Recurrence::EveryDay => single_day(anchor, due_time),
        Recurrence::OnceWeekly => once_weekly(cal, anchor, due_time),
        Recurrence::Weekday(day) => specific_weekday(cal, anchor, day, due_time),
        Recurrence::OnceMonthly => once_monthly(cal, anchor, due_time),
        Recurrence::StartOfMonth(month) => start_of_month(cal, anchor, month, due_time),
        Recurrence::EndOfMonth(month) => end_of_month(cal, anchor, month, due_time),
    };

    // Once-off and daily cutoffs never consult the holiday set; everything
    // else degrades when a touched year has no data yet.
    if !matches!(
        rec,
        Recurrence::OnceOff | Recurrence::OnceOffSticky | Recurrence::EveryDay
    ) {
        flag_unloaded_years(cal, &mut cutoff);
    }
    cutoff
}

/// Appearance, due and lock all on the anchor date; no carry.
fn single_day(anchor: NaiveDate, due_time: NaiveTime) -> FrequencyCutoff {
    FrequencyCutoff {
        appearance: anchor,
        due_date: anchor,
        due_time,
        lock_date: Some(anchor),
        lock_time: Some(lock_time()),
        carry_start: anchor,
        carry_end: Some(anchor),
        degraded: false,
        warnings: Vec::new(),
    }
}

fn once_off(
    anchor: NaiveDate,
    explicit_due_date: Option<NaiveDate>,
    due_time: NaiveTime,
) -> FrequencyCutoff {
    let mut warnings = Vec::new();
    let mut degraded = false;
    let due = match explicit_due_date {
        Some(d) => d,
        None => {
            tracing::warn!("once-off code without a due date, using the instance date");
            warnings.push("once-off code without a due date; using the instance date".into());
            degraded = true;
            anchor
        }
    };
    let appearance = anchor.min(due);
    FrequencyCutoff {
        appearance,
        due_date: due,
        due_time,
        lock_date: None,
        lock_time: None,
        carry_start: appearance,
        carry_end: None,
        degraded,
        warnings,
    }
}

fn once_weekly(cal: &Calendar, anchor: NaiveDate, due_time: NaiveTime) -> FrequencyCutoff {
    let (Some(appearance), Some(due)) = (
        cal.first_business_day_of_week(anchor),
        cal.last_business_day_of_week(anchor),
    ) else {
        let mut cutoff = single_day(anchor, due_time);
        cutoff.degraded = true;
        cutoff
            .warnings
            .push("no business day in the anchor week".into());
        return cutoff;
    };
    FrequencyCutoff {
        appearance,
        due_date: due,
        due_time,
        lock_date: Some(due),
        lock_time: Some(lock_time()),
        carry_start: appearance,
        carry_end: Some(due),
        degraded: false,
        warnings: Vec::new(),
    }
}

fn specific_weekday(
    cal: &Calendar,
    anchor: NaiveDate,
    day: Weekday,
    due_time: NaiveTime,
) -> FrequencyCutoff {
    let monday = Calendar::week_monday(anchor);
    let target = monday + Duration::days(day.num_days_from_monday() as i64);

    let appearance = if cal.is_business_day(target) {
        target
    } else if day == Weekday::Mon {
        // Monday work shifts forward into the week.
        cal.next_business_day_on_or_after(target + Duration::days(1))
    } else {
        // Later weekdays first try earlier days of the same week.
        let mut shifted = None;
        let mut candidate = target - Duration::days(1);
        while candidate >= monday {
            if cal.is_business_day(candidate) {
                shifted = Some(candidate);
                break;
            }
            candidate -= Duration::days(1);
        }
        shifted.unwrap_or_else(|| cal.next_business_day_on_or_after(target + Duration::days(1)))
    };

    // The forward walk can leave the week entirely; the lock must not
    // precede the shifted due date.
    let week_lock = cal
        .last_business_day_of_week(anchor)
        .unwrap_or(appearance)
        .max(appearance);

    FrequencyCutoff {
        appearance,
        due_date: appearance,
        due_time,
        lock_date: Some(week_lock),
        lock_time: Some(lock_time()),
        carry_start: appearance,
        carry_end: Some(week_lock),
        degraded: false,
        warnings: Vec::new(),
    }
}

fn once_monthly(cal: &Calendar, anchor: NaiveDate, due_time: NaiveTime) -> FrequencyCutoff {
    let month_first = first_of_month(anchor.year(), anchor.month()).unwrap_or(anchor);
    let appearance = cal.next_business_day_on_or_after(month_first);
    let due = cal.adjusted_last_saturday(month_first);
    FrequencyCutoff {
        appearance,
        due_date: due,
        due_time,
        lock_date: Some(due),
        lock_time: Some(lock_time()),
        carry_start: appearance,
        carry_end: Some(due),
        degraded: false,
        warnings: Vec::new(),
    }
}

fn start_of_month(
    cal: &Calendar,
    anchor: NaiveDate,
    month: Option<u32>,
    due_time: NaiveTime,
) -> FrequencyCutoff {
    let month_first = month_anchor(anchor, month);
    let appearance = cal.next_business_day_on_or_after(month_first);
    let due = cal.add_business_days(appearance, 5);
    let lock = cal.adjusted_last_saturday(month_first);
    FrequencyCutoff {
        appearance,
        due_date: due,
        due_time,
        lock_date: Some(lock),
        lock_time: Some(lock_time()),
        carry_start: appearance,
        carry_end: Some(lock),
        degraded: false,
        warnings: Vec::new(),
    }
}

fn end_of_month(
    cal: &Calendar,
    anchor: NaiveDate,
    month: Option<u32>,
    due_time: NaiveTime,
) -> FrequencyCutoff {
    let month_first = month_anchor(anchor, month);
    let due = cal.adjusted_last_saturday(month_first);

    // Walk back week by week until the span Monday..=due holds at least
    // five business days.
    let mut monday = Calendar::week_monday(due);
    let mut weeks_back = 0;
    while cal.business_days_between(monday, due) < 5 && weeks_back < 8 {
        monday -= Duration::days(7);
        weeks_back += 1;
    }
    let appearance = monday;
    let carry_end = Calendar::week_saturday(appearance).min(due);

    FrequencyCutoff {
        appearance,
        due_date: due,
        due_time,
        lock_date: Some(due),
        lock_time: Some(lock_time()),
        carry_start: appearance,
        carry_end: Some(carry_end),
        degraded: false,
        warnings: Vec::new(),
    }
}

/// First day of the month the code anchors to: the anchor's own month for
/// every-month codes, otherwise the next occurrence of the named month.
fn month_anchor(anchor: NaiveDate, month: Option<u32>) -> NaiveDate {
    let m = month.unwrap_or(anchor.month());
    let y = if m >= anchor.month() {
        anchor.year()
    } else {
        anchor.year() + 1
    };
    first_of_month(y, m).unwrap_or(anchor)
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn flag_unloaded_years(cal: &Calendar, cutoff: &mut FrequencyCutoff) {
    let mut years = vec![cutoff.appearance.year(), cutoff.due_date.year()];
    if let Some(lock) = cutoff.lock_date {
        years.push(lock.year());
    }
    years.sort_unstable();
    years.dedup();
    for year in years {
        if !cal.is_loaded(year) {
            tracing::warn!(year, "holiday data not loaded, treating the year as holiday-free");
            cutoff.degraded = true;
            cutoff
                .warnings
                .push(format!("holiday data for {year} not loaded"));
        }
    }
}
