use crate::periods::ReportingPeriods;
use crate::AnnotatedRecord;

/// Stock bought before last month's year-ago window opened and issued during
/// last month (current year): old enough to have been dead, finally moving.
pub fn is_liquidated_last_month(record: &AnnotatedRecord, periods: &ReportingPeriods) -> bool {
    if record.stock_qty().is_nan() || record.stock_qty() <= 0.0 {
        return false;
    }

    let old_purchase = record
        .purchase_date()
        .is_some_and(|purchased| purchased < periods.last_month_last_year.start);
    let issued_last_month = record
        .issue_date()
        .is_some_and(|issued| periods.last_month.contains(issued));

    old_purchase && issued_last_month
}

pub fn liquidated_last_month<'a>(
    records: &'a [AnnotatedRecord],
    periods: &ReportingPeriods,
) -> Vec<&'a AnnotatedRecord> {
    records
        .iter()
        .filter(|record| is_liquidated_last_month(record, periods))
        .collect()
}
