//! Dead stock: on-hand quantity with no issue in the last 365 days.
//!
//! Dead lines are further labelled by which year-ago calendar window their
//! last purchase fell into, giving a "what came in around now last year and
//! never sold" view. Lines that are not dead still carry a label
//! ([`DeadStockLabel::NoStock`] or [`DeadStockLabel::RecentIssue`]).

use crate::periods::ReportingPeriods;
use crate::utils::days_between;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issues within this many days keep a line out of dead stock.
pub const RECENT_ISSUE_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum DeadStockLabel {
    #[serde(rename = "No Stock")]
    NoStock,
    #[serde(rename = "Recent Issue")]
    RecentIssue,
    #[serde(rename = "Current Month")]
    CurrentMonth,
    #[serde(rename = "Last Month")]
    LastMonth,
    #[serde(rename = "Last to Last Month")]
    LastToLastMonth,
    #[serde(rename = "Earlier")]
    Earlier,
}

impl DeadStockLabel {
    pub fn label(&self) -> &'static str {
        match self {
            DeadStockLabel::NoStock => "No Stock",
            DeadStockLabel::RecentIssue => "Recent Issue",
            DeadStockLabel::CurrentMonth => "Current Month",
            DeadStockLabel::LastMonth => "Last Month",
            DeadStockLabel::LastToLastMonth => "Last to Last Month",
            DeadStockLabel::Earlier => "Earlier",
        }
    }
}

impl fmt::Display for DeadStockLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeadStockStatus {
    pub is_dead: bool,
    pub label: DeadStockLabel,
}

impl DeadStockStatus {
    fn alive(label: DeadStockLabel) -> Self {
        Self { is_dead: false, label }
    }

    fn dead(label: DeadStockLabel) -> Self {
        Self { is_dead: true, label }
    }
}

/// Classifies one inventory line. A missing issue date counts as never issued.
pub fn evaluate(
    stock_qty: f64,
    issue_date: Option<NaiveDate>,
    purchase_date: Option<NaiveDate>,
    periods: &ReportingPeriods,
) -> DeadStockStatus {
    if stock_qty.is_nan() || stock_qty <= 0.0 {
        return DeadStockStatus::alive(DeadStockLabel::NoStock);
    }

    let issued_recently = issue_date
        .map(|issued| days_between(issued, periods.today) <= RECENT_ISSUE_DAYS)
        .unwrap_or(false);
    if issued_recently {
        return DeadStockStatus::alive(DeadStockLabel::RecentIssue);
    }

    let Some(purchased) = purchase_date else {
        return DeadStockStatus::dead(DeadStockLabel::Earlier);
    };

    let label = if periods.current_month_last_year.contains(purchased) {
        DeadStockLabel::CurrentMonth
    } else if periods.last_month_last_year.contains(purchased) {
        DeadStockLabel::LastMonth
    } else if periods.last_to_last_month_last_year.contains(purchased) {
        DeadStockLabel::LastToLastMonth
    } else {
        DeadStockLabel::Earlier
    };

    DeadStockStatus::dead(label)
}
