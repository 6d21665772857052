//! Calendar windows derived from a single reference date.
//!
//! Every classification in a batch is measured against one [`ReportingPeriods`]
//! value, so all records share the same notion of "today", "last month" and
//! their one-year-ago counterparts.

use crate::error::Result;
use crate::utils::{day_before, first_of_month, last_day_of_month, years_back};
use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An inclusive `[start, end]` date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The same window one year earlier, clamping 29 February to the 28th.
    pub fn year_ago(&self) -> Result<Self> {
        Ok(Self {
            start: years_back(self.start, 1)?,
            end: years_back(self.end, 1)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReportingPeriods {
    pub today: NaiveDate,
    /// First day of the current month up to and including `today`.
    pub current_month: PeriodWindow,
    pub last_month: PeriodWindow,
    pub last_to_last_month: PeriodWindow,
    /// Current month one year ago, cut off at the as-on date (`today` less a year).
    pub current_month_last_year: PeriodWindow,
    /// Current month one year ago, whole month.
    pub current_month_last_year_complete: PeriodWindow,
    pub last_month_last_year: PeriodWindow,
    pub last_to_last_month_last_year: PeriodWindow,
}

impl ReportingPeriods {
    pub fn compute(today: NaiveDate) -> Result<Self> {
        let current_month_start = first_of_month(today);
        let last_month_end = day_before(current_month_start)?;
        let last_month_start = first_of_month(last_month_end);
        let last_to_last_month_end = day_before(last_month_start)?;
        let last_to_last_month_start = first_of_month(last_to_last_month_end);

        let current_month = PeriodWindow::new(current_month_start, today);
        let last_month = PeriodWindow::new(last_month_start, last_month_end);
        let last_to_last_month =
            PeriodWindow::new(last_to_last_month_start, last_to_last_month_end);

        let current_month_last_year = current_month.year_ago()?;
        let current_month_last_year_complete = PeriodWindow::new(
            current_month_last_year.start,
            last_day_of_month(current_month_last_year.start)?,
        );

        let periods = Self {
            today,
            current_month,
            last_month,
            last_to_last_month,
            current_month_last_year,
            current_month_last_year_complete,
            last_month_last_year: last_month.year_ago()?,
            last_to_last_month_last_year: last_to_last_month.year_ago()?,
        };

        debug!(
            "Reporting periods for {}: current month from {}, last month {} to {}, last to last month {} to {}",
            today,
            periods.current_month.start,
            periods.last_month.start,
            periods.last_month.end,
            periods.last_to_last_month.start,
            periods.last_to_last_month.end
        );

        Ok(periods)
    }

    pub fn current_month_start(&self) -> NaiveDate {
        self.current_month.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_periods_mid_month() {
        let periods = ReportingPeriods::compute(ymd(2024, 3, 15)).unwrap();

        assert_eq!(periods.current_month, PeriodWindow::new(ymd(2024, 3, 1), ymd(2024, 3, 15)));
        assert_eq!(periods.last_month, PeriodWindow::new(ymd(2024, 2, 1), ymd(2024, 2, 29)));
        assert_eq!(
            periods.last_to_last_month,
            PeriodWindow::new(ymd(2024, 1, 1), ymd(2024, 1, 31))
        );
        assert_eq!(
            periods.current_month_last_year,
            PeriodWindow::new(ymd(2023, 3, 1), ymd(2023, 3, 15))
        );
        assert_eq!(
            periods.current_month_last_year_complete,
            PeriodWindow::new(ymd(2023, 3, 1), ymd(2023, 3, 31))
        );
        // 2024-02-29 has no counterpart in 2023
        assert_eq!(
            periods.last_month_last_year,
            PeriodWindow::new(ymd(2023, 2, 1), ymd(2023, 2, 28))
        );
        assert_eq!(
            periods.last_to_last_month_last_year,
            PeriodWindow::new(ymd(2023, 1, 1), ymd(2023, 1, 31))
        );
    }

    #[test]
    fn test_periods_across_year_boundary() {
        let periods = ReportingPeriods::compute(ymd(2024, 1, 10)).unwrap();

        assert_eq!(periods.last_month, PeriodWindow::new(ymd(2023, 12, 1), ymd(2023, 12, 31)));
        assert_eq!(
            periods.last_to_last_month,
            PeriodWindow::new(ymd(2023, 11, 1), ymd(2023, 11, 30))
        );
        assert_eq!(
            periods.last_month_last_year,
            PeriodWindow::new(ymd(2022, 12, 1), ymd(2022, 12, 31))
        );
    }

    #[test]
    fn test_periods_on_leap_day() {
        let periods = ReportingPeriods::compute(ymd(2024, 2, 29)).unwrap();

        assert_eq!(
            periods.current_month_last_year,
            PeriodWindow::new(ymd(2023, 2, 1), ymd(2023, 2, 28))
        );
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let window = PeriodWindow::new(ymd(2024, 2, 1), ymd(2024, 2, 29));
        assert!(window.contains(ymd(2024, 2, 1)));
        assert!(window.contains(ymd(2024, 2, 29)));
        assert!(!window.contains(ymd(2024, 3, 1)));
        assert!(!window.contains(ymd(2024, 1, 31)));
    }
}
