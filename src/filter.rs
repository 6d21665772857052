//! Categorical filters and purchase/issue date-window queries over annotated
//! records.
//!
//! Every date-window call pattern reduces to one of two primitives:
//! [`stock_in_range`] (purchase date only) and [`dead_stock_in_range`]
//! (purchase date plus a "not validly sold" test on the issue date).

use crate::aging::AgingBucket;
use crate::error::Result;
use crate::schema::{ColumnMapping, SourceField};
use crate::utils::years_back;
use crate::AnnotatedRecord;
use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Optional constraints, AND-ed across dimensions. Each list is an OR of
/// equality tests; `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RecordFilter {
    /// Matched against the purchase aging bucket.
    pub movement: Option<Vec<AgingBucket>>,
    pub part_category: Option<Vec<String>>,
    pub location: Option<Vec<String>>,
    pub abc_class: Option<Vec<String>>,
    pub ris_code: Option<Vec<String>>,
    /// Case-insensitive substring of the part number.
    pub part_number: Option<String>,
}

/// Splits a comma-separated parameter. Blank input means "no constraint".
fn split_list(raw: &str) -> Option<Vec<String>> {
    if raw.trim().is_empty() {
        return None;
    }
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket labels in either short (`0-90`) or report (`0 to 90 days`)
    /// form. Unknown labels match nothing.
    pub fn with_movement(mut self, raw: &str) -> Self {
        self.movement = split_list(raw).map(|labels| {
            labels
                .iter()
                .filter_map(|l| AgingBucket::from_label(l))
                .collect()
        });
        self
    }

    pub fn with_part_category(mut self, raw: &str) -> Self {
        self.part_category = split_list(raw);
        self
    }

    pub fn with_location(mut self, raw: &str) -> Self {
        self.location = split_list(raw);
        self
    }

    pub fn with_abc_class(mut self, raw: &str) -> Self {
        self.abc_class = split_list(raw);
        self
    }

    pub fn with_ris_code(mut self, raw: &str) -> Self {
        self.ris_code = split_list(raw);
        self
    }

    pub fn with_part_number(mut self, raw: &str) -> Self {
        let needle = raw.trim();
        self.part_number = (!needle.is_empty()).then(|| needle.to_string());
        self
    }

    /// Constraints on a field with no bound column are ignored.
    pub fn matches(&self, record: &AnnotatedRecord, columns: &ColumnMapping) -> bool {
        let r = &record.record;

        let movement_ok = self
            .movement
            .as_ref()
            .map_or(true, |buckets| buckets.contains(&record.annotations.aging_bucket_purchase));

        movement_ok
            && one_of(&self.part_category, &r.part_category, columns, SourceField::PartCategory)
            && one_of(&self.location, &r.location, columns, SourceField::Location)
            && one_of(&self.abc_class, &r.abc_class, columns, SourceField::AbcClass)
            && one_of(&self.ris_code, &r.ris_code, columns, SourceField::RisCode)
            && self.part_number_matches(r.part_number.as_deref(), columns)
    }

    fn part_number_matches(&self, part_number: Option<&str>, columns: &ColumnMapping) -> bool {
        let Some(needle) = &self.part_number else {
            return true;
        };
        if !columns.has(SourceField::PartNumber) {
            return true;
        }
        part_number.is_some_and(|p| p.to_lowercase().contains(&needle.to_lowercase()))
    }

    pub fn select<'a>(
        &self,
        records: &'a [AnnotatedRecord],
        columns: &ColumnMapping,
    ) -> Vec<&'a AnnotatedRecord> {
        records
            .iter()
            .filter(|record| self.matches(record, columns))
            .collect()
    }
}

fn one_of(
    allowed: &Option<Vec<String>>,
    value: &Option<String>,
    columns: &ColumnMapping,
    field: SourceField,
) -> bool {
    match allowed {
        None => true,
        Some(_) if !columns.has(field) => true,
        Some(allowed) => value.as_ref().is_some_and(|v| allowed.contains(v)),
    }
}

fn purchased_within(
    record: &AnnotatedRecord,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> bool {
    record.purchase_date().is_some_and(|purchased| {
        from.map_or(true, |f| purchased >= f) && to.map_or(true, |t| purchased <= t)
    })
}

/// True when the line has no valid sale: no issue date, an issue date before
/// the purchase (stale data), or an issue after `not_sold_cutoff`.
fn not_validly_sold(record: &AnnotatedRecord, not_sold_cutoff: Option<NaiveDate>) -> bool {
    let Some(issued) = record.issue_date() else {
        return true;
    };
    let before_purchase = record.purchase_date().is_some_and(|p| issued < p);
    let after_cutoff = not_sold_cutoff.is_some_and(|cutoff| issued > cutoff);
    before_purchase || after_cutoff
}

/// Records purchased in `[from, to]` (open bounds when `None`) that were not
/// validly sold. With `not_sold_cutoff = None`, any issue on or after the
/// purchase counts as a sale.
pub fn dead_stock_in_range<'a, I>(
    records: I,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    not_sold_cutoff: Option<NaiveDate>,
) -> Vec<&'a AnnotatedRecord>
where
    I: IntoIterator<Item = &'a AnnotatedRecord>,
{
    records
        .into_iter()
        .filter(|r| purchased_within(r, from, to) && not_validly_sold(r, not_sold_cutoff))
        .collect()
}

/// Records purchased in `[from, to]`, regardless of issue history.
pub fn stock_in_range<'a, I>(
    records: I,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<&'a AnnotatedRecord>
where
    I: IntoIterator<Item = &'a AnnotatedRecord>,
{
    records
        .into_iter()
        .filter(|r| purchased_within(r, from, to))
        .collect()
}

/// Named date-window queries used by the reporting layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RangeQuery {
    /// Bought in the year-ago equivalent of `[from, to]` and not sold by `to`.
    NotSoldByRangeEnd { from: NaiveDate, to: NaiveDate },

    /// Bought in the year-ago equivalent of the (possibly open) range and never
    /// validly sold. With neither bound set, every record is selected.
    NeverSoldInYearAgoRange {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },

    /// Bought in `[from, to]` as given, no issue test.
    PurchasedInRange {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },

    /// Cumulative stock bought on or before `to`.
    PurchasedUpTo { to: NaiveDate },
}

impl RangeQuery {
    /// The purchase-date bounds actually applied, after any year shift.
    pub fn purchase_window(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        let shift = |d: Option<NaiveDate>| d.map(|d| years_back(d, 1)).transpose();
        match *self {
            RangeQuery::NotSoldByRangeEnd { from, to } => {
                Ok((Some(years_back(from, 1)?), Some(years_back(to, 1)?)))
            }
            RangeQuery::NeverSoldInYearAgoRange { from, to } => Ok((shift(from)?, shift(to)?)),
            RangeQuery::PurchasedInRange { from, to } => Ok((from, to)),
            RangeQuery::PurchasedUpTo { to } => Ok((None, Some(to))),
        }
    }

    pub fn not_sold_cutoff(&self) -> Option<NaiveDate> {
        match *self {
            RangeQuery::NotSoldByRangeEnd { to, .. } => Some(to),
            _ => None,
        }
    }

    pub fn select<'a, I>(&self, records: I) -> Result<Vec<&'a AnnotatedRecord>>
    where
        I: IntoIterator<Item = &'a AnnotatedRecord>,
    {
        let (from, to) = self.purchase_window()?;
        debug!("Range query {:?}: purchase window {:?} to {:?}", self, from, to);

        let selected = match *self {
            RangeQuery::NeverSoldInYearAgoRange {
                from: None,
                to: None,
            } => records.into_iter().collect(),
            RangeQuery::NotSoldByRangeEnd { .. } | RangeQuery::NeverSoldInYearAgoRange { .. } => {
                dead_stock_in_range(records, from, to, self.not_sold_cutoff())
            }
            RangeQuery::PurchasedInRange { .. } | RangeQuery::PurchasedUpTo { .. } => {
                stock_in_range(records, from, to)
            }
        };

        Ok(selected)
    }
}
