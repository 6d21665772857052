//! Immutable annotated batches and the store that publishes them.
//!
//! A rebuild produces a brand-new [`Snapshot`]; the [`SnapshotStore`] swaps
//! its `Arc` in under a short write lock. Readers clone the current `Arc` and
//! query it for as long as they like, unaffected by later rebuilds.

use crate::aging::AgingBucket;
use crate::engine::Classifier;
use crate::error::{AgeingError, Result};
use crate::filter::{RangeQuery, RecordFilter};
use crate::ingestion::RawTable;
use crate::liquidation::is_liquidated_last_month;
use crate::model_group::ModelGroupMap;
use crate::periods::ReportingPeriods;
use crate::schema::{AgeingConfig, ColumnMapping};
use crate::summary::{AgingSummary, CategoryMatrix, DeadStockSummary, ValueCount};
use crate::AnnotatedRecord;
use chrono::NaiveDate;
use log::{info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::SystemTime;

/// Distinct values offered as filter choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FilterOptions {
    pub locations: Vec<String>,
    pub abc_classes: Vec<String>,
    pub ris_codes: Vec<String>,
    pub part_categories: Vec<String>,
    /// Purchase aging buckets present in the batch, youngest first.
    pub movement_buckets: Vec<AgingBucket>,
}

impl FilterOptions {
    pub fn from_records(records: &[AnnotatedRecord]) -> Self {
        fn distinct<'a>(values: impl Iterator<Item = Option<&'a String>>) -> Vec<String> {
            values
                .flatten()
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }

        let present: BTreeSet<AgingBucket> = records
            .iter()
            .map(|r| r.annotations.aging_bucket_purchase)
            .collect();

        Self {
            locations: distinct(records.iter().map(|r| r.record.location.as_ref())),
            abc_classes: distinct(records.iter().map(|r| r.record.abc_class.as_ref())),
            ris_codes: distinct(records.iter().map(|r| r.record.ris_code.as_ref())),
            part_categories: distinct(records.iter().map(|r| r.record.part_category.as_ref())),
            movement_buckets: present.into_iter().collect(),
        }
    }
}

/// One fully annotated batch. All records were classified against
/// `periods.today`; nothing in a snapshot changes after it is built.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    version: u64,
    periods: ReportingPeriods,
    columns: ColumnMapping,
    records: Vec<AnnotatedRecord>,
    options: FilterOptions,
}

impl Snapshot {
    /// Resolves columns, converts rows and annotates them.
    ///
    /// Fails only on batch-level problems (missing date columns, a reference
    /// date too close to the calendar limits); bad cells never fail a build.
    pub fn build(
        table: &RawTable,
        today: NaiveDate,
        model_groups: Option<&ModelGroupMap>,
    ) -> Result<Self> {
        let columns = table.resolve_columns()?;
        let mut classifier = Classifier::new(today)?;
        if let Some(groups) = model_groups {
            classifier = classifier.with_model_groups(groups);
        }

        let records = classifier.annotate_all(table.to_records(&columns));
        let options = FilterOptions::from_records(&records);

        Ok(Self {
            version: 0,
            periods: classifier.periods().clone(),
            columns,
            records,
            options,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn today(&self) -> NaiveDate {
        self.periods.today
    }

    pub fn periods(&self) -> &ReportingPeriods {
        &self.periods
    }

    pub fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    pub fn records(&self) -> &[AnnotatedRecord] {
        &self.records
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of stock value (GNDP) across the whole batch.
    pub fn total_value(&self) -> f64 {
        self.records.iter().map(|r| r.stock_value()).sum()
    }

    pub fn select(&self, filter: &RecordFilter) -> Vec<&AnnotatedRecord> {
        filter.select(&self.records, &self.columns)
    }

    /// Categorical filter first, then the date-window query.
    pub fn query(&self, filter: &RecordFilter, range: &RangeQuery) -> Result<Vec<&AnnotatedRecord>> {
        range.select(self.select(filter))
    }

    pub fn totals(&self, filter: &RecordFilter, range: Option<&RangeQuery>) -> Result<ValueCount> {
        let selected = match range {
            Some(range) => self.query(filter, range)?,
            None => self.select(filter),
        };
        Ok(ValueCount::of(selected))
    }

    pub fn liquidated_last_month(&self, filter: &RecordFilter) -> Vec<&AnnotatedRecord> {
        self.select(filter)
            .into_iter()
            .filter(|r| is_liquidated_last_month(r, &self.periods))
            .collect()
    }

    pub fn aging_summary(&self, filter: &RecordFilter) -> AgingSummary {
        AgingSummary::from_records(&self.select(filter))
    }

    pub fn category_matrix(&self, filter: &RecordFilter) -> CategoryMatrix {
        CategoryMatrix::from_records(&self.select(filter))
    }

    pub fn dead_stock_summary(&self, filter: &RecordFilter) -> DeadStockSummary {
        DeadStockSummary::from_records(&self.select(filter), &self.periods)
    }
}

#[derive(Debug, Default)]
struct RebuildState {
    next_version: u64,
    source_modified: Option<SystemTime>,
}

/// Holds the published snapshot. Rebuilds run one at a time; readers are
/// never blocked by a rebuild in progress, only by the pointer swap itself.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
    last_error: RwLock<Option<String>>,
    rebuild: Mutex<RebuildState>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn require_current(&self) -> Result<Arc<Snapshot>> {
        self.current().ok_or(AgeingError::NoSnapshot)
    }

    /// Message from the most recent failed rebuild, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Builds and publishes a snapshot from an in-memory table (upload or
    /// manual replacement). On failure the previous snapshot stays published.
    pub fn rebuild_from_table(
        &self,
        table: &RawTable,
        today: NaiveDate,
        model_groups: Option<&ModelGroupMap>,
    ) -> Result<Arc<Snapshot>> {
        let mut state = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        self.build_and_publish(&mut state, table, today, model_groups)
    }

    /// Reads the configured source (and model groups, if any) and publishes a
    /// new snapshot.
    pub fn load(&self, config: &AgeingConfig) -> Result<Arc<Snapshot>> {
        let mut state = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        self.load_locked(&mut state, config)
    }

    /// Rebuilds only when the source file's modification time differs from
    /// the one seen at the last successful load. Returns `None` when nothing
    /// changed.
    pub fn reload_if_modified(&self, config: &AgeingConfig) -> Result<Option<Arc<Snapshot>>> {
        let mut state = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);

        let modified = modified_time(&config.source_path);
        if modified.is_some() && modified == state.source_modified {
            return Ok(None);
        }

        info!("Source {} changed, reloading", config.source_path.display());
        self.load_locked(&mut state, config).map(Some)
    }

    fn load_locked(&self, state: &mut RebuildState, config: &AgeingConfig) -> Result<Arc<Snapshot>> {
        let model_groups = config
            .model_group_path
            .as_deref()
            .and_then(|path| match ModelGroupMap::from_csv_path(path) {
                Ok(groups) => Some(groups),
                Err(e) => {
                    warn!("Model groups unavailable ({}): {}", path.display(), e);
                    None
                }
            });

        let modified = modified_time(&config.source_path);
        let table = RawTable::from_csv_path(&config.source_path).inspect_err(|e| {
            self.record_failure(e);
        })?;

        let snapshot = self.build_and_publish(state, &table, config.today(), model_groups.as_ref())?;
        state.source_modified = modified;
        Ok(snapshot)
    }

    fn build_and_publish(
        &self,
        state: &mut RebuildState,
        table: &RawTable,
        today: NaiveDate,
        model_groups: Option<&ModelGroupMap>,
    ) -> Result<Arc<Snapshot>> {
        let mut snapshot = Snapshot::build(table, today, model_groups).inspect_err(|e| {
            self.record_failure(e);
        })?;

        state.next_version += 1;
        snapshot.version = state.next_version;
        let snapshot = Arc::new(snapshot);

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snapshot));
        *self.last_error.write().unwrap_or_else(PoisonError::into_inner) = None;

        info!(
            "Published snapshot v{} with {} records ({} columns bound) as of {}",
            snapshot.version,
            snapshot.len(),
            snapshot.columns.columns.len(),
            snapshot.today()
        );

        Ok(snapshot)
    }

    fn record_failure(&self, error: &AgeingError) {
        warn!("Rebuild failed, keeping previous snapshot: {}", error);
        *self.last_error.write().unwrap_or_else(PoisonError::into_inner) = Some(error.to_string());
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
