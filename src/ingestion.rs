use crate::error::Result;
use crate::schema::{ColumnMapping, SourceField};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// One stocked part at one location, as read from the source table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InventoryRecord {
    pub part_number: Option<String>,
    pub location: Option<String>,
    pub part_category: Option<String>,
    pub abc_class: Option<String>,
    pub ris_code: Option<String>,
    /// On-hand quantity; unreadable cells become 0.
    pub stock_qty: f64,
    pub last_issue_qty: f64,
    /// Stock value at GNDP; unreadable cells become 0.
    pub stock_value: f64,
    pub last_issue_date: Option<String>,
    pub last_purchase_date: Option<String>,
}

/// A header row plus string cells, before any field binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Reads a CSV document with a header row. Short rows are accepted; their
    /// missing cells read as empty.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_csv_reader(file)?;
        debug!("Read {} rows from {}", table.rows.len(), path.display());
        Ok(table)
    }

    pub fn resolve_columns(&self) -> Result<ColumnMapping> {
        ColumnMapping::resolve(&self.headers)
    }

    /// Converts every row through `mapping`. Unbound fields stay empty or 0.
    pub fn to_records(&self, mapping: &ColumnMapping) -> Vec<InventoryRecord> {
        self.rows
            .iter()
            .map(|row| {
                let cell = |field: SourceField| {
                    mapping
                        .index(field)
                        .and_then(|idx| row.get(idx))
                        .map(String::as_str)
                };
                let text = |field: SourceField| non_blank(cell(field));

                InventoryRecord {
                    part_number: text(SourceField::PartNumber),
                    location: text(SourceField::Location),
                    part_category: text(SourceField::PartCategory),
                    abc_class: text(SourceField::AbcClass),
                    ris_code: text(SourceField::RisCode),
                    stock_qty: coerce_number(cell(SourceField::StockQty)),
                    last_issue_qty: coerce_number(cell(SourceField::LastIssueQty)),
                    stock_value: coerce_number(cell(SourceField::StockValue)),
                    last_issue_date: text(SourceField::LastIssueDate),
                    last_purchase_date: text(SourceField::LastPurchaseDate),
                }
            })
            .collect()
    }
}

fn non_blank(cell: Option<&str>) -> Option<String> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numeric cell to `f64`. Blank, non-numeric and non-finite input all become 0.
pub fn coerce_number(cell: Option<&str>) -> f64 {
    cell.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
