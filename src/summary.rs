use crate::aging::AgingBucket;
use crate::filter::dead_stock_in_range;
use crate::liquidation::is_liquidated_last_month;
use crate::periods::{PeriodWindow, ReportingPeriods};
use crate::AnnotatedRecord;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Line count and summed stock value (GNDP).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValueCount {
    pub count: usize,
    pub value: f64,
}

impl ValueCount {
    pub fn add(&mut self, record: &AnnotatedRecord) {
        self.count += 1;
        self.value += record.stock_value();
    }

    pub fn merge(&mut self, other: &ValueCount) {
        self.count += other.count;
        self.value += other.value;
    }

    pub fn of<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AnnotatedRecord>,
    {
        let mut total = Self::default();
        for record in records {
            total.add(record);
        }
        total
    }
}

fn empty_buckets() -> BTreeMap<AgingBucket, ValueCount> {
    AgingBucket::ALL
        .into_iter()
        .map(|bucket| (bucket, ValueCount::default()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgingRow {
    pub location: String,
    pub buckets: BTreeMap<AgingBucket, ValueCount>,
}

/// Per-location count and value in each purchase aging bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgingSummary {
    pub rows: Vec<AgingRow>,
    /// Sum of the rows; lines without a location are not counted.
    pub total: BTreeMap<AgingBucket, ValueCount>,
}

impl AgingSummary {
    pub fn from_records(records: &[&AnnotatedRecord]) -> Self {
        let mut by_location: BTreeMap<&str, BTreeMap<AgingBucket, ValueCount>> = BTreeMap::new();

        for record in records {
            let Some(location) = record.record.location.as_deref() else {
                continue;
            };
            by_location
                .entry(location)
                .or_insert_with(empty_buckets)
                .entry(record.annotations.aging_bucket_purchase)
                .or_default()
                .add(record);
        }

        let mut total = empty_buckets();
        let rows = by_location
            .into_iter()
            .map(|(location, buckets)| {
                for (bucket, vc) in &buckets {
                    total.entry(*bucket).or_default().merge(vc);
                }
                AgingRow {
                    location: location.to_string(),
                    buckets,
                }
            })
            .collect();

        Self { rows, total }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryRow {
    pub location: String,
    pub values: BTreeMap<String, f64>,
    pub total: f64,
}

/// Stock value by location and part category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryMatrix {
    pub part_categories: Vec<String>,
    pub rows: Vec<CategoryRow>,
    pub totals: BTreeMap<String, f64>,
    pub grand_total: f64,
}

impl CategoryMatrix {
    pub fn from_records(records: &[&AnnotatedRecord]) -> Self {
        let part_categories: Vec<String> = records
            .iter()
            .filter_map(|r| r.record.part_category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let zeroed = || -> BTreeMap<String, f64> {
            part_categories.iter().map(|c| (c.clone(), 0.0)).collect()
        };

        let mut by_location: BTreeMap<&str, BTreeMap<String, f64>> = BTreeMap::new();
        for record in records {
            let (Some(location), Some(category)) = (
                record.record.location.as_deref(),
                record.record.part_category.as_ref(),
            ) else {
                continue;
            };
            *by_location
                .entry(location)
                .or_insert_with(zeroed)
                .entry(category.clone())
                .or_default() += record.stock_value();
        }

        // locations whose lines all lack a category still get a zero row
        for record in records {
            if let Some(location) = record.record.location.as_deref() {
                by_location.entry(location).or_insert_with(zeroed);
            }
        }

        let mut totals = zeroed();
        let rows: Vec<CategoryRow> = by_location
            .into_iter()
            .map(|(location, values)| {
                for (category, value) in &values {
                    *totals.entry(category.clone()).or_default() += value;
                }
                CategoryRow {
                    location: location.to_string(),
                    total: values.values().sum(),
                    values,
                }
            })
            .collect();

        let grand_total = totals.values().sum();

        Self {
            part_categories,
            rows,
            totals,
            grand_total,
        }
    }
}

/// Dead-stock totals per year-ago purchase window plus last month's
/// liquidation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeadStockSummary {
    pub current_month_as_on_date: ValueCount,
    pub current_month_complete: ValueCount,
    pub last_month: ValueCount,
    pub last_to_last_month: ValueCount,
    /// Every line flagged as dead stock, whatever its window.
    pub total: ValueCount,
    pub last_month_liquidation: ValueCount,
}

impl DeadStockSummary {
    pub fn from_records(records: &[&AnnotatedRecord], periods: &ReportingPeriods) -> Self {
        let in_stock: Vec<&AnnotatedRecord> = records
            .iter()
            .copied()
            .filter(|r| r.stock_qty() > 0.0)
            .collect();

        let window = |w: &PeriodWindow| {
            ValueCount::of(dead_stock_in_range(
                in_stock.iter().copied(),
                Some(w.start),
                Some(w.end),
                None,
            ))
        };

        Self {
            current_month_as_on_date: window(&periods.current_month_last_year),
            current_month_complete: window(&periods.current_month_last_year_complete),
            last_month: window(&periods.last_month_last_year),
            last_to_last_month: window(&periods.last_to_last_month_last_year),
            total: ValueCount::of(records.iter().copied().filter(|r| r.is_dead_stock())),
            last_month_liquidation: ValueCount::of(
                records
                    .iter()
                    .copied()
                    .filter(|r| is_liquidated_last_month(r, periods)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Classifier;
    use crate::ingestion::InventoryRecord;
    use chrono::NaiveDate;

    fn line(
        location: Option<&str>,
        category: Option<&str>,
        qty: f64,
        value: f64,
        issue: Option<&str>,
        purchase: Option<&str>,
    ) -> InventoryRecord {
        InventoryRecord {
            location: location.map(str::to_string),
            part_category: category.map(str::to_string),
            stock_qty: qty,
            stock_value: value,
            last_issue_date: issue.map(str::to_string),
            last_purchase_date: purchase.map(str::to_string),
            ..Default::default()
        }
    }

    fn sample() -> (Classifier<'static>, Vec<AnnotatedRecord>) {
        let classifier = Classifier::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()).unwrap();
        let records = classifier.annotate_all(vec![
            // dead, current month last year (as on date)
            line(Some("Pune"), Some("Spares"), 2.0, 10.0, None, Some("2023-03-10")),
            // dead, current month last year but after the as-on date
            line(Some("Pune"), Some("Oil"), 1.0, 5.0, None, Some("2023-03-25")),
            // dead, last month last year
            line(Some("Nashik"), Some("Spares"), 4.0, 2.5, None, Some("2023-02-14")),
            // liquidated last month
            line(Some("Nashik"), None, 1.0, 1.0, Some("2024-02-20"), Some("2021-05-01")),
            // no stock: excluded from windows even though never sold
            line(None, Some("Oil"), 0.0, 7.0, None, Some("2023-01-10")),
        ]);
        (classifier, records)
    }

    #[test]
    fn test_dead_stock_summary() {
        let (classifier, records) = sample();
        let refs: Vec<&AnnotatedRecord> = records.iter().collect();
        let summary = DeadStockSummary::from_records(&refs, classifier.periods());

        assert_eq!(summary.current_month_as_on_date, ValueCount { count: 1, value: 10.0 });
        assert_eq!(summary.current_month_complete, ValueCount { count: 2, value: 15.0 });
        assert_eq!(summary.last_month, ValueCount { count: 1, value: 2.5 });
        assert_eq!(summary.last_to_last_month, ValueCount::default());
        assert_eq!(summary.total.count, 3);
        assert_eq!(summary.last_month_liquidation, ValueCount { count: 1, value: 1.0 });
    }

    #[test]
    fn test_aging_summary_rows_and_total() {
        let (_, records) = sample();
        let refs: Vec<&AnnotatedRecord> = records.iter().collect();
        let summary = AgingSummary::from_records(&refs);

        let locations: Vec<&str> = summary.rows.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(locations, vec!["Nashik", "Pune"]);
        assert_eq!(summary.rows[0].buckets.len(), 5);

        let pune = &summary.rows[1].buckets;
        assert_eq!(pune[&AgingBucket::Days366To730], ValueCount { count: 1, value: 10.0 });
        assert_eq!(pune[&AgingBucket::Days181To365], ValueCount { count: 1, value: 5.0 });

        let counted: usize = summary.total.values().map(|vc| vc.count).sum();
        assert_eq!(counted, 4);
    }

    #[test]
    fn test_category_matrix() {
        let (_, records) = sample();
        let refs: Vec<&AnnotatedRecord> = records.iter().collect();
        let matrix = CategoryMatrix::from_records(&refs);

        assert_eq!(matrix.part_categories, vec!["Oil".to_string(), "Spares".to_string()]);
        assert_eq!(matrix.rows.len(), 2);

        let nashik = &matrix.rows[0];
        assert_eq!(nashik.location, "Nashik");
        assert_eq!(nashik.values["Spares"], 2.5);
        assert_eq!(nashik.values["Oil"], 0.0);
        assert_eq!(nashik.total, 2.5);

        assert_eq!(matrix.totals["Oil"], 5.0);
        assert_eq!(matrix.totals["Spares"], 12.5);
        assert_eq!(matrix.grand_total, 17.5);
    }
}
