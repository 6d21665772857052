use crate::aging::{aging_bucket, purchase_month_bucket};
use crate::dead_stock::evaluate;
use crate::error::Result;
use crate::ingestion::InventoryRecord;
use crate::model_group::ModelGroupMap;
use crate::periods::ReportingPeriods;
use crate::utils::parse_date;
use crate::{AnnotatedRecord, Annotations};
use chrono::NaiveDate;
use log::info;

/// Annotates records against one fixed reference date.
///
/// The periods are computed once in [`Classifier::new`], so every record
/// annotated by the same classifier shares them.
pub struct Classifier<'a> {
    periods: ReportingPeriods,
    model_groups: Option<&'a ModelGroupMap>,
}

impl<'a> Classifier<'a> {
    pub fn new(today: NaiveDate) -> Result<Self> {
        Ok(Self {
            periods: ReportingPeriods::compute(today)?,
            model_groups: None,
        })
    }

    pub fn with_model_groups(mut self, model_groups: &'a ModelGroupMap) -> Self {
        self.model_groups = Some(model_groups);
        self
    }

    pub fn periods(&self) -> &ReportingPeriods {
        &self.periods
    }

    pub fn today(&self) -> NaiveDate {
        self.periods.today
    }

    pub fn annotate(&self, record: InventoryRecord) -> AnnotatedRecord {
        let today = self.today();
        let issue_date = parse_date(record.last_issue_date.as_deref());
        let purchase_date = parse_date(record.last_purchase_date.as_deref());
        let status = evaluate(record.stock_qty, issue_date, purchase_date, &self.periods);

        let model_group = self
            .model_groups
            .map(|groups| groups.lookup(record.part_number.as_deref()))
            .unwrap_or_default();

        let annotations = Annotations {
            issue_date,
            purchase_date,
            aging_bucket_issue: aging_bucket(issue_date, today),
            aging_bucket_purchase: aging_bucket(purchase_date, today),
            purchase_month_bucket: purchase_month_bucket(purchase_date, &self.periods),
            is_dead_stock: status.is_dead,
            dead_stock_window_label: status.label,
            model_group,
        };

        AnnotatedRecord {
            record,
            annotations,
        }
    }

    pub fn annotate_all(&self, records: Vec<InventoryRecord>) -> Vec<AnnotatedRecord> {
        let annotated: Vec<AnnotatedRecord> =
            records.into_iter().map(|r| self.annotate(r)).collect();

        let dead = annotated.iter().filter(|r| r.is_dead_stock()).count();
        info!(
            "Classified {} records against {} ({} dead stock)",
            annotated.len(),
            self.today(),
            dead
        );

        annotated
    }
}
