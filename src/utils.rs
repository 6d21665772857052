use crate::error::{AgeingError, Result};
use chrono::{Datelike, Months, NaiveDate};

/// Accepted date layouts, tried in this order. Day-first layouts come before
/// the month-first one, so `05/06/2024` reads as 5 June.
pub const DATE_FORMATS: [&str; 5] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Placeholder the source reports use for "no date".
pub const MISSING_DATE_PLACEHOLDER: &str = "-";

/// Only the leading date portion of a cell is considered; any time-of-day
/// suffix after it is dropped.
const DATE_PREFIX_LEN: usize = 10;

/// Parses a raw date cell into a calendar date.
///
/// Returns `None` for a missing cell, the `-` placeholder, blank text, or text
/// that matches none of [`DATE_FORMATS`].
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || trimmed == MISSING_DATE_PLACEHOLDER {
        return None;
    }

    let prefix: String = trimmed.chars().take(DATE_PREFIX_LEN).collect();
    let prefix = prefix.trim();

    DATE_FORMATS
        .iter()
        .filter(|fmt| has_four_digit_year(prefix, fmt))
        .find_map(|fmt| NaiveDate::parse_from_str(prefix, fmt).ok())
}

/// chrono's `%Y` also takes one to three digit years; a two-digit year such
/// as `15/03/24` must not read as year 24.
fn has_four_digit_year(text: &str, fmt: &str) -> bool {
    let mut fields = text.split(|c: char| !c.is_ascii_digit());
    let year = if fmt.starts_with("%Y") {
        fields.next()
    } else {
        fields.last()
    };
    year.is_some_and(|y| y.len() == 4)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn day_before(date: NaiveDate) -> Result<NaiveDate> {
    date.pred_opt()
        .ok_or_else(|| AgeingError::DateError(format!("No calendar day precedes {}", date)))
}

/// Same month and day, `years` earlier. A day that does not exist in the
/// target year (29 February) clamps to the last day of that month.
pub fn years_back(date: NaiveDate, years: u32) -> Result<NaiveDate> {
    date.checked_sub_months(Months::new(12 * years))
        .ok_or_else(|| {
            AgeingError::DateError(format!("Cannot move {} back by {} year(s)", date, years))
        })
}

/// Whole days from `from` to `to`; negative when `from` lies after `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

pub fn last_day_of_month(date: NaiveDate) -> Result<NaiveDate> {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| AgeingError::DateError(format!("No month end after {}", date)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_supported_formats() {
        assert_eq!(parse_date(Some("15/03/2024")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date(Some("15-03-2024")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date(Some("2024-03-15")), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date(Some("03/25/2024")), Some(ymd(2024, 3, 25)));
        assert_eq!(parse_date(Some("15.03.2024")), Some(ymd(2024, 3, 15)));
    }

    #[test]
    fn test_parse_date_prefers_day_first() {
        assert_eq!(parse_date(Some("05/06/2024")), Some(ymd(2024, 6, 5)));
    }

    #[test]
    fn test_parse_date_drops_time_suffix() {
        assert_eq!(
            parse_date(Some("2024-03-15 10:45:00")),
            Some(ymd(2024, 3, 15))
        );
        assert_eq!(
            parse_date(Some("15/03/2024 00:00:00")),
            Some(ymd(2024, 3, 15))
        );
    }

    #[test]
    fn test_parse_date_missing_values() {
        assert_eq!(parse_date(None), None);
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(Some("   ")), None);
        assert_eq!(parse_date(Some("-")), None);
        assert_eq!(parse_date(Some("not a date")), None);
        assert_eq!(parse_date(Some("31/02/2024")), None);
    }

    #[test]
    fn test_parse_date_requires_four_digit_year() {
        assert_eq!(parse_date(Some("15/03/24")), None);
        assert_eq!(parse_date(Some("5/6/24")), None);
        assert_eq!(parse_date(Some("24-03-15")), None);
        assert_eq!(parse_date(Some("5/6/2024")), Some(ymd(2024, 6, 5)));
    }

    #[test]
    fn test_years_back_clamps_leap_day() {
        assert_eq!(years_back(ymd(2024, 2, 29), 1).unwrap(), ymd(2023, 2, 28));
        assert_eq!(years_back(ymd(2024, 3, 15), 1).unwrap(), ymd(2023, 3, 15));
        assert_eq!(years_back(ymd(2024, 2, 29), 4).unwrap(), ymd(2020, 2, 29));
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(first_of_month(ymd(2024, 3, 15)), ymd(2024, 3, 1));
        assert_eq!(day_before(ymd(2024, 3, 1)).unwrap(), ymd(2024, 2, 29));
        assert_eq!(last_day_of_month(ymd(2023, 2, 10)).unwrap(), ymd(2023, 2, 28));
        assert_eq!(last_day_of_month(ymd(2023, 12, 1)).unwrap(), ymd(2023, 12, 31));
    }

    #[test]
    fn test_days_between_sign() {
        assert_eq!(days_between(ymd(2024, 1, 1), ymd(2024, 1, 31)), 30);
        assert_eq!(days_between(ymd(2024, 1, 31), ymd(2024, 1, 1)), -30);
    }
}
