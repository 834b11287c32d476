//! Tests for tolerant date and time parsing.

use chrono::{Datelike, NaiveDate, NaiveTime};
use yearload::temporal::{DEFAULT_TIME_FORMAT, resolve_date, resolve_time};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn accepted_date_layouts() {
    let expected = ymd(2022, 3, 1);
    for text in [
        "03/01/2022",
        "3/1/2022",
        "2022-03-01",
        "2022/03/01",
        "03-01-2022",
        "20220301",
        "2022-03-01T14:05:00.000",
        "2022-03-01 14:05:00",
        "2022-03-01T14:05",
        "03/01/2022 02:05:00 PM",
        "03/01/2022 14:05",
        "  2022-03-01  ",
    ] {
        assert_eq!(resolve_date(text), Some(expected), "{text:?}");
    }
}

#[test]
fn two_digit_years_land_in_their_century() {
    assert_eq!(resolve_date("3/1/22"), Some(ymd(2022, 3, 1)));
    assert_eq!(resolve_date("03/01/22"), Some(ymd(2022, 3, 1)));
    assert_eq!(resolve_date("12-31-99"), Some(ymd(1999, 12, 31)));
    assert_eq!(resolve_date("03/01/22 14:05"), Some(ymd(2022, 3, 1)));
}

#[test]
fn short_year_tokens_never_become_ancient_dates() {
    for text in ["3/1/22", "0022-03-01", "22/03/01", "3/1/202"] {
        let parsed = resolve_date(text);
        assert!(parsed.is_none_or(|d| d.year() >= 1000), "{text:?} -> {parsed:?}");
    }
}

#[test]
fn zoned_timestamps_keep_the_written_date() {
    for text in [
        "2022-03-01T00:00:00Z",
        "2022-03-01T23:30:00-05:00",
        "2022-03-01T08:00:00.250+09:00",
        "2022-03-01 23:30:00+05:00",
    ] {
        assert_eq!(resolve_date(text), Some(ymd(2022, 3, 1)), "{text:?}");
    }
}

#[test]
fn ambiguous_dates_are_month_first() {
    assert_eq!(resolve_date("04/05/2021"), Some(ymd(2021, 4, 5)));
}

#[test]
fn rejected_dates() {
    for text in ["", "   ", "notadate", "2022-13-01", "02/30/2022", "2022", "1646092800"] {
        assert_eq!(resolve_date(text), None, "{text:?}");
    }
}

#[test]
fn time_default_format() {
    assert_eq!(
        resolve_time("14:05", DEFAULT_TIME_FORMAT),
        NaiveTime::from_hms_opt(14, 5, 0)
    );
    assert_eq!(
        resolve_time("9:30", DEFAULT_TIME_FORMAT),
        NaiveTime::from_hms_opt(9, 30, 0)
    );
}

#[test]
fn time_is_strict() {
    assert_eq!(resolve_time("14:05:30", DEFAULT_TIME_FORMAT), None);
    assert_eq!(resolve_time("25:00", DEFAULT_TIME_FORMAT), None);
    assert_eq!(resolve_time("", DEFAULT_TIME_FORMAT), None);
    assert_eq!(resolve_time("noon", DEFAULT_TIME_FORMAT), None);
}

#[test]
fn time_custom_format() {
    assert_eq!(
        resolve_time("14:05:30", "%H:%M:%S"),
        NaiveTime::from_hms_opt(14, 5, 30)
    );
}
