//! # Spares Ageing
//!
//! A library for classifying spare-parts inventory lines (one per part per
//! location) by how long they have sat since their last movement.
//!
//! ## Core Concepts
//!
//! - **Reference date**: every annotation in a batch is computed against one
//!   "today"; the calendar windows derived from it live in [`ReportingPeriods`]
//! - **Aging bucket**: days since a movement date, in five fixed ranges
//! - **Dead stock**: stock on hand with no issue in the last 365 days, labelled
//!   by which year-ago window its last purchase fell into
//! - **Liquidation**: old stock that was finally issued last month
//! - **Snapshot**: an immutable, fully annotated batch published through a
//!   [`SnapshotStore`] and queried with [`RecordFilter`] and [`RangeQuery`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use spares_ageing::*;
//! use chrono::NaiveDate;
//!
//! let table = RawTable::from_csv_path("ageing.csv".as_ref())?;
//! let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
//!
//! let store = SnapshotStore::new();
//! let snapshot = store.rebuild_from_table(&table, today, None)?;
//!
//! let filter = RecordFilter::new().with_location("Pune,Nashik");
//! let summary = snapshot.dead_stock_summary(&filter);
//! println!("dead stock value: {}", summary.total.value);
//! ```

pub mod aging;
pub mod dead_stock;
pub mod engine;
pub mod error;
pub mod filter;
pub mod ingestion;
pub mod liquidation;
pub mod model_group;
pub mod periods;
pub mod schema;
pub mod snapshot;
pub mod summary;
pub mod utils;

pub use aging::{aging_bucket, purchase_month_bucket, AgingBucket, PurchaseMonthBucket};
pub use dead_stock::{evaluate, DeadStockLabel, DeadStockStatus};
pub use engine::Classifier;
pub use error::{AgeingError, Result};
pub use filter::{dead_stock_in_range, stock_in_range, RangeQuery, RecordFilter};
pub use ingestion::{InventoryRecord, RawTable};
pub use liquidation::{is_liquidated_last_month, liquidated_last_month};
pub use model_group::ModelGroupMap;
pub use periods::{PeriodWindow, ReportingPeriods};
pub use schema::{AgeingConfig, BoundColumn, ColumnMapping, SourceField};
pub use snapshot::{FilterOptions, Snapshot, SnapshotStore};
pub use summary::{AgingSummary, CategoryMatrix, DeadStockSummary, ValueCount};
pub use utils::parse_date;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Everything the engine derives for one record. Written only by
/// [`Classifier`], never by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Annotations {
    /// Parsed last-issue date, `None` when missing or unreadable
    pub issue_date: Option<NaiveDate>,
    /// Parsed last-purchase date, `None` when missing or unreadable
    pub purchase_date: Option<NaiveDate>,
    pub aging_bucket_issue: AgingBucket,
    pub aging_bucket_purchase: AgingBucket,
    /// Independent of `aging_bucket_purchase`; the two may disagree
    pub purchase_month_bucket: PurchaseMonthBucket,
    pub is_dead_stock: bool,
    /// Present for every record; "No Stock" and "Recent Issue" mark live stock
    pub dead_stock_window_label: DeadStockLabel,
    /// Vehicle model details from the part-number prefix, empty when unknown
    pub model_group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnnotatedRecord {
    #[serde(flatten)]
    pub record: InventoryRecord,
    #[serde(flatten)]
    pub annotations: Annotations,
}

impl AnnotatedRecord {
    pub fn stock_qty(&self) -> f64 {
        self.record.stock_qty
    }

    /// Stock value at GNDP.
    pub fn stock_value(&self) -> f64 {
        self.record.stock_value
    }

    pub fn issue_date(&self) -> Option<NaiveDate> {
        self.annotations.issue_date
    }

    pub fn purchase_date(&self) -> Option<NaiveDate> {
        self.annotations.purchase_date
    }

    pub fn is_dead_stock(&self) -> bool {
        self.annotations.is_dead_stock
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnnotatedRecord)
    }
}

/// Classifies and publishes a table in one step, without a long-lived store.
pub fn process_inventory(table: &RawTable, today: NaiveDate) -> Result<Snapshot> {
    Snapshot::build(table, today, None)
}
