//! Business-day calendar with per-year public-holiday sets.
//!
//! A business day is any day that is not a Sunday and not a public holiday;
//! Saturdays count as business days unless they are holidays. Holiday data is
//! loaded per year. Querying a year that was never loaded soft-fails to
//! "holiday-free" — the cutoff calculator flags such results as degraded so
//! callers can recompute once the data arrives.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Weekday};

/// Upper bound for the day-at-a-time walks; a span this long without a
/// business day means the holiday data is malformed.
const MAX_WALK_DAYS: i64 = 366;

/// Holiday-aware calendar for a single fixed civil timezone.
#[derive(Debug, Clone)]
pub struct Calendar {
    holidays: BTreeMap<i32, BTreeSet<NaiveDate>>,
    offset: FixedOffset,
}

impl Calendar {
    pub fn new(offset: FixedOffset) -> Self {
        Calendar {
            holidays: BTreeMap::new(),
            offset,
        }
    }

    /// The fixed civil UTC offset used to date completion timestamps.
    pub fn utc_offset(&self) -> FixedOffset {
        self.offset
    }

    /// Record the holiday set for a year. Idempotent; loading a year again
    /// replaces its set. An empty set still marks the year as loaded.
    pub fn load_year(&mut self, year: i32, dates: impl IntoIterator<Item = NaiveDate>) {
        let set = self.holidays.entry(year).or_default();
        set.clear();
        set.extend(dates);
    }

    /// Whether holiday data for a year has been supplied.
    pub fn is_loaded(&self, year: i32) -> bool {
        self.holidays.contains_key(&year)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays
            .get(&date.year())
            .map(|set| set.contains(&date))
            .unwrap_or(false)
    }

    /// Not a Sunday and not a holiday.
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        date.weekday() != Weekday::Sun && !self.is_holiday(date)
    }

    /// Walk forward one day at a time to the first business day on or after
    /// `from`.
    pub fn next_business_day_on_or_after(&self, from: NaiveDate) -> NaiveDate {
        let mut date = from;
        for _ in 0..MAX_WALK_DAYS {
            if self.is_business_day(date) {
                return date;
            }
            date += Duration::days(1);
        }
        from
    }

    /// Walk backward one day at a time to the last business day on or before
    /// `from`.
    pub fn prev_business_day_on_or_before(&self, from: NaiveDate) -> NaiveDate {
        let mut date = from;
        for _ in 0..MAX_WALK_DAYS {
            if self.is_business_day(date) {
                return date;
            }
            date -= Duration::days(1);
        }
        from
    }

    /// Advance `n` business days past `from`.
    pub fn add_business_days(&self, from: NaiveDate, n: u32) -> NaiveDate {
        let mut date = from;
        let mut remaining = n;
        let mut walked = 0i64;
        while remaining > 0 && walked < MAX_WALK_DAYS {
            date += Duration::days(1);
            walked += 1;
            if self.is_business_day(date) {
                remaining -= 1;
            }
        }
        date
    }

    /// Count business days in `from..=to`.
    pub fn business_days_between(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        let mut count = 0;
        let mut date = from;
        while date <= to {
            if self.is_business_day(date) {
                count += 1;
            }
            date += Duration::days(1);
        }
        count
    }

    /// Monday of the week containing `date`. Sundays belong to the week that
    /// started six days earlier.
    pub fn week_monday(date: NaiveDate) -> NaiveDate {
        date - Duration::days(date.weekday().num_days_from_monday() as i64)
    }

    /// Saturday of the Monday-based week containing `date`.
    pub fn week_saturday(date: NaiveDate) -> NaiveDate {
        Self::week_monday(date) + Duration::days(5)
    }

    /// First business day within the Mon–Sat span of `date`'s week.
    pub fn first_business_day_of_week(&self, date: NaiveDate) -> Option<NaiveDate> {
        let monday = Self::week_monday(date);
        (0..6)
            .map(|i| monday + Duration::days(i))
            .find(|d| self.is_business_day(*d))
    }

    /// Last business day within the Mon–Sat span of `date`'s week.
    pub fn last_business_day_of_week(&self, date: NaiveDate) -> Option<NaiveDate> {
        let monday = Self::week_monday(date);
        (0..6)
            .rev()
            .map(|i| monday + Duration::days(i))
            .find(|d| self.is_business_day(*d))
    }

    /// Last calendar day of the month containing `date`.
    pub fn month_end(date: NaiveDate) -> NaiveDate {
        let (y, m) = (date.year(), date.month());
        let next_first = if m == 12 {
            NaiveDate::from_ymd_opt(y + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(y, m + 1, 1)
        };
        next_first.map(|d| d - Duration::days(1)).unwrap_or(date)
    }

    /// Last Saturday of the month containing `date`, before any holiday
    /// adjustment.
    pub fn last_saturday_of_month(date: NaiveDate) -> NaiveDate {
        let end = Self::month_end(date);
        let back = (end.weekday().num_days_from_monday() + 7 - 5) % 7;
        end - Duration::days(back as i64)
    }

    /// Last Saturday of the month, pushed back to the previous business day
    /// when that Saturday is itself a holiday.
    pub fn adjusted_last_saturday(&self, date: NaiveDate) -> NaiveDate {
        self.prev_business_day_on_or_before(Self::last_saturday_of_month(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cal(holidays: &[NaiveDate]) -> Calendar {
        let mut cal = Calendar::new(FixedOffset::east_opt(0).unwrap());
        cal.load_year(2024, holidays.iter().copied());
        cal
    }

    #[test]
    fn test_sunday_is_never_a_business_day() {
        let cal = cal(&[]);
        // 2024-06-09 is a Sunday, 2024-06-08 a Saturday.
        assert!(!cal.is_business_day(d(2024, 6, 9)));
        assert!(cal.is_business_day(d(2024, 6, 8)));
    }

    #[test]
    fn test_holiday_saturday_is_not_a_business_day() {
        let cal = cal(&[d(2024, 6, 8)]);
        assert!(!cal.is_business_day(d(2024, 6, 8)));
    }

    #[test]
    fn test_unloaded_year_soft_fails_to_holiday_free() {
        let cal = cal(&[]);
        assert!(!cal.is_loaded(2023));
        // 2023-12-25 is a Monday; with no data it counts as a business day.
        assert!(cal.is_business_day(d(2023, 12, 25)));
    }

    #[test]
    fn test_walks_skip_sundays_and_holidays() {
        // 2024-06-07 Fri holiday, 2024-06-08 Sat holiday, 2024-06-09 Sun.
        let cal = cal(&[d(2024, 6, 7), d(2024, 6, 8)]);
        assert_eq!(cal.next_business_day_on_or_after(d(2024, 6, 7)), d(2024, 6, 10));
        assert_eq!(cal.prev_business_day_on_or_before(d(2024, 6, 9)), d(2024, 6, 6));
    }

    #[test]
    fn test_add_business_days() {
        let cal = cal(&[]);
        // 2024-06-01 is a Saturday; Sunday 2nd is skipped.
        assert_eq!(cal.add_business_days(d(2024, 6, 1), 5), d(2024, 6, 7));
    }

    #[test]
    fn test_week_bounds() {
        // 2024-06-05 is a Wednesday.
        assert_eq!(Calendar::week_monday(d(2024, 6, 5)), d(2024, 6, 3));
        assert_eq!(Calendar::week_saturday(d(2024, 6, 5)), d(2024, 6, 8));
        // Sunday belongs to the week that just ended.
        assert_eq!(Calendar::week_monday(d(2024, 6, 9)), d(2024, 6, 3));
    }

    #[test]
    fn test_first_and_last_business_day_of_week() {
        let cal = cal(&[d(2024, 6, 3), d(2024, 6, 8)]);
        assert_eq!(cal.first_business_day_of_week(d(2024, 6, 5)), Some(d(2024, 6, 4)));
        assert_eq!(cal.last_business_day_of_week(d(2024, 6, 5)), Some(d(2024, 6, 7)));
    }

    #[test]
    fn test_first_business_day_of_month_skips_new_year() {
        let cal = cal(&[d(2024, 1, 1)]);
        assert_eq!(cal.next_business_day_on_or_after(d(2024, 1, 1)), d(2024, 1, 2));
    }

    #[test]
    fn test_last_saturday_of_month() {
        assert_eq!(Calendar::last_saturday_of_month(d(2024, 6, 5)), d(2024, 6, 29));
        assert_eq!(Calendar::last_saturday_of_month(d(2024, 1, 10)), d(2024, 1, 27));
        // December rollover.
        assert_eq!(Calendar::last_saturday_of_month(d(2024, 12, 1)), d(2024, 12, 28));
    }

    #[test]
    fn test_adjusted_last_saturday_pushes_back_over_holiday() {
        let cal = cal(&[d(2024, 6, 29), d(2024, 6, 28)]);
        assert_eq!(cal.adjusted_last_saturday(d(2024, 6, 5)), d(2024, 6, 27));
    }

    #[test]
    fn test_load_year_is_idempotent_and_replaces() {
        let mut cal = cal(&[d(2024, 6, 7)]);
        cal.load_year(2024, [d(2024, 6, 10)]);
        assert!(cal.is_business_day(d(2024, 6, 7)));
        assert!(!cal.is_business_day(d(2024, 6, 10)));
    }
}
