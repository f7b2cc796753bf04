//! Property tests - calendar key conversions and month ranges over every 4-digit year

use chrono::{Datelike, NaiveDate};
use loadgrid_core::calendar::{self, CalendarKey};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_to_date_is_first_of_month(
        year in 1000i32..=9999,
        month in 1u32..=12,
        day in 1u32..=31
    ) {
        let date = NaiveDate::from_ymd_opt(year, month, day);
        prop_assume!(date.is_some());
        let date = date.unwrap();

        let first = CalendarKey::from_date(date).unwrap().to_date();
        prop_assert_eq!(first.year(), year);
        prop_assert_eq!(first.month(), month);
        prop_assert_eq!(first.day(), 1);
    }

    #[test]
    fn prop_display_string_round_trip(year in 1000i32..=9999, month in 1u32..=12) {
        let key = CalendarKey::from_parts(year, month).unwrap();
        let display = key.to_display_string();
        prop_assert_eq!(&display, &format!("{:04} {:02}", year, month));
        prop_assert_eq!(CalendarKey::from_display_string(&display).unwrap(), key);
        prop_assert_eq!(display.parse::<CalendarKey>().unwrap(), key);
        prop_assert_eq!(key.as_u32().to_string().parse::<CalendarKey>().unwrap(), key);
    }

    #[test]
    fn prop_range_is_contiguous_and_ordered(
        year in 1000i32..=9999,
        month in 1u32..=12,
        span in 0i32..120
    ) {
        let start = CalendarKey::from_parts(year, month).unwrap();
        let end = start.offset(span);
        prop_assume!(end.is_some());
        let end = end.unwrap();

        let months = calendar::range(start, end);
        prop_assert_eq!(months.len(), span as usize + 1);
        prop_assert_eq!(months.first(), Some(&start));
        prop_assert_eq!(months.last(), Some(&end));
        for pair in months.windows(2) {
            prop_assert!(pair[0] < pair[1]);
            prop_assert_eq!(pair[0].next(), Some(pair[1]));
        }

        if span > 0 {
            prop_assert!(calendar::range(end, start).is_empty());
        }
    }

    #[test]
    fn prop_from_parts_rejects_months_outside_calendar(
        year in 1000i32..=9999,
        month in prop_oneof![Just(0u32), 13u32..=u32::MAX]
    ) {
        prop_assert!(CalendarKey::from_parts(year, month).is_err());
    }
}
