use crate::periods::ReportingPeriods;
use crate::utils::days_between;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days elapsed since a movement date. Variants are declared youngest first,
/// so `Ord` follows age.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum AgingBucket {
    #[serde(rename = "0-90")]
    #[schemars(description = "Moved 90 days ago or less (future dates included)")]
    Days0To90,

    #[serde(rename = "91-180")]
    Days91To180,

    #[serde(rename = "181-365")]
    Days181To365,

    #[serde(rename = "366-730")]
    Days366To730,

    #[serde(rename = "730+")]
    #[schemars(description = "Older than 730 days, or the date is missing/unreadable")]
    Over730,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 5] = [
        AgingBucket::Days0To90,
        AgingBucket::Days91To180,
        AgingBucket::Days181To365,
        AgingBucket::Days366To730,
        AgingBucket::Over730,
    ];

    /// Thresholds are inclusive upper bounds.
    pub fn from_days(days: i64) -> Self {
        match days {
            d if d <= 90 => AgingBucket::Days0To90,
            d if d <= 180 => AgingBucket::Days91To180,
            d if d <= 365 => AgingBucket::Days181To365,
            d if d <= 730 => AgingBucket::Days366To730,
            _ => AgingBucket::Over730,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBucket::Days0To90 => "0-90",
            AgingBucket::Days91To180 => "91-180",
            AgingBucket::Days181To365 => "181-365",
            AgingBucket::Days366To730 => "366-730",
            AgingBucket::Over730 => "730+",
        }
    }

    /// Wording used on the printed ageing report.
    pub fn report_label(&self) -> &'static str {
        match self {
            AgingBucket::Days0To90 => "0 to 90 days",
            AgingBucket::Days91To180 => "91 to 180 days",
            AgingBucket::Days181To365 => "181 to 365 days",
            AgingBucket::Days366To730 => "366 to 730 days",
            AgingBucket::Over730 => "730 and above",
        }
    }

    /// Accepts either the short or the report label.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|b| b.label() == label || b.report_label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for AgingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Calendar-month bucket for recent dates, falling back to the aging buckets
/// for anything older than the last-to-last month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum PurchaseMonthBucket {
    #[serde(rename = "Current Month")]
    CurrentMonth,
    #[serde(rename = "Last Month")]
    LastMonth,
    #[serde(rename = "Last to Last Month")]
    LastToLastMonth,
    #[serde(rename = "0-90")]
    Days0To90,
    #[serde(rename = "91-180")]
    Days91To180,
    #[serde(rename = "181-365")]
    Days181To365,
    #[serde(rename = "366-730")]
    Days366To730,
    #[serde(rename = "730+")]
    Over730,
}

impl PurchaseMonthBucket {
    pub fn label(&self) -> &'static str {
        match self {
            PurchaseMonthBucket::CurrentMonth => "Current Month",
            PurchaseMonthBucket::LastMonth => "Last Month",
            PurchaseMonthBucket::LastToLastMonth => "Last to Last Month",
            PurchaseMonthBucket::Days0To90 => AgingBucket::Days0To90.label(),
            PurchaseMonthBucket::Days91To180 => AgingBucket::Days91To180.label(),
            PurchaseMonthBucket::Days181To365 => AgingBucket::Days181To365.label(),
            PurchaseMonthBucket::Days366To730 => AgingBucket::Days366To730.label(),
            PurchaseMonthBucket::Over730 => AgingBucket::Over730.label(),
        }
    }
}

impl From<AgingBucket> for PurchaseMonthBucket {
    fn from(bucket: AgingBucket) -> Self {
        match bucket {
            AgingBucket::Days0To90 => PurchaseMonthBucket::Days0To90,
            AgingBucket::Days91To180 => PurchaseMonthBucket::Days91To180,
            AgingBucket::Days181To365 => PurchaseMonthBucket::Days181To365,
            AgingBucket::Days366To730 => PurchaseMonthBucket::Days366To730,
            AgingBucket::Over730 => PurchaseMonthBucket::Over730,
        }
    }
}

impl fmt::Display for PurchaseMonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Missing dates land in the oldest bucket; future dates in the youngest.
pub fn aging_bucket(date: Option<NaiveDate>, today: NaiveDate) -> AgingBucket {
    match date {
        None => AgingBucket::Over730,
        Some(date) => AgingBucket::from_days(days_between(date, today).max(0)),
    }
}

pub fn purchase_month_bucket(
    date: Option<NaiveDate>,
    periods: &ReportingPeriods,
) -> PurchaseMonthBucket {
    let Some(date) = date else {
        return PurchaseMonthBucket::Over730;
    };

    if date >= periods.current_month_start() {
        PurchaseMonthBucket::CurrentMonth
    } else if periods.last_month.contains(date) {
        PurchaseMonthBucket::LastMonth
    } else if periods.last_to_last_month.contains(date) {
        PurchaseMonthBucket::LastToLastMonth
    } else {
        let days = days_between(date, periods.today);
        if days < 0 {
            PurchaseMonthBucket::CurrentMonth
        } else {
            AgingBucket::from_days(days).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_aging_bucket_thresholds() {
        let today = ymd(2024, 3, 15);
        let ago = |days: u64| Some(today.checked_sub_days(Days::new(days)).unwrap());

        assert_eq!(aging_bucket(ago(0), today), AgingBucket::Days0To90);
        assert_eq!(aging_bucket(ago(90), today), AgingBucket::Days0To90);
        assert_eq!(aging_bucket(ago(91), today), AgingBucket::Days91To180);
        assert_eq!(aging_bucket(ago(180), today), AgingBucket::Days91To180);
        assert_eq!(aging_bucket(ago(181), today), AgingBucket::Days181To365);
        assert_eq!(aging_bucket(ago(365), today), AgingBucket::Days181To365);
        assert_eq!(aging_bucket(ago(366), today), AgingBucket::Days366To730);
        assert_eq!(aging_bucket(ago(730), today), AgingBucket::Days366To730);
        assert_eq!(aging_bucket(ago(731), today), AgingBucket::Over730);
    }

    #[test]
    fn test_aging_bucket_missing_and_future() {
        let today = ymd(2024, 3, 15);
        assert_eq!(aging_bucket(None, today), AgingBucket::Over730);
        assert_eq!(aging_bucket(Some(ymd(2025, 1, 1)), today), AgingBucket::Days0To90);
    }

    #[test]
    fn test_aging_bucket_is_monotonic() {
        let today = ymd(2024, 3, 15);
        let mut previous = AgingBucket::Days0To90;
        for days in 0..1000u64 {
            let date = today.checked_sub_days(Days::new(days)).unwrap();
            let bucket = aging_bucket(Some(date), today);
            assert!(bucket >= previous, "bucket went backwards at {} days", days);
            previous = bucket;
        }
    }

    #[test]
    fn test_purchase_month_bucket() {
        let periods = ReportingPeriods::compute(ymd(2024, 3, 15)).unwrap();

        let cases = [
            (Some(ymd(2024, 3, 1)), PurchaseMonthBucket::CurrentMonth),
            (Some(ymd(2024, 4, 2)), PurchaseMonthBucket::CurrentMonth),
            (Some(ymd(2024, 2, 29)), PurchaseMonthBucket::LastMonth),
            (Some(ymd(2024, 2, 1)), PurchaseMonthBucket::LastMonth),
            (Some(ymd(2024, 1, 1)), PurchaseMonthBucket::LastToLastMonth),
            (Some(ymd(2023, 12, 31)), PurchaseMonthBucket::Days0To90),
            (Some(ymd(2023, 9, 1)), PurchaseMonthBucket::Days181To365),
            (Some(ymd(2020, 1, 1)), PurchaseMonthBucket::Over730),
            (None, PurchaseMonthBucket::Over730),
        ];

        for (date, expected) in cases {
            assert_eq!(purchase_month_bucket(date, &periods), expected, "date {:?}", date);
        }
    }

    #[test]
    fn test_labels_round_trip_through_from_label() {
        for bucket in AgingBucket::ALL {
            assert_eq!(AgingBucket::from_label(bucket.label()), Some(bucket));
            assert_eq!(AgingBucket::from_label(bucket.report_label()), Some(bucket));
        }
        assert_eq!(AgingBucket::from_label("Last Month"), None);
    }

    #[test]
    fn test_bucket_serializes_as_label() {
        let json = serde_json::to_string(&AgingBucket::Over730).unwrap();
        assert_eq!(json, "\"730+\"");
        let json = serde_json::to_string(&PurchaseMonthBucket::LastToLastMonth).unwrap();
        assert_eq!(json, "\"Last to Last Month\"");
    }
}
