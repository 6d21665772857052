use crate::error::{AgeingError, Result};
use chrono::{Local, NaiveDate};
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Logical fields the engine reads from a source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceField {
    LastIssueDate,
    LastPurchaseDate,
    LastIssueQty,
    StockQty,
    StockValue,
    Location,
    PartCategory,
    PartNumber,
    AbcClass,
    RisCode,
}

enum HeaderRule {
    /// Lower-cased header contains every `all` term and none of the `none` terms.
    Contains {
        all: &'static [&'static str],
        none: &'static [&'static str],
    },
    /// Upper-cased, trimmed header equals the text.
    Exact(&'static str),
}

impl HeaderRule {
    fn matches(&self, header: &str) -> bool {
        match self {
            HeaderRule::Contains { all, none } => {
                let lower = header.to_lowercase();
                all.iter().all(|term| lower.contains(term))
                    && !none.iter().any(|term| lower.contains(term))
            }
            HeaderRule::Exact(expected) => header.trim().to_uppercase() == *expected,
        }
    }
}

impl SourceField {
    pub const ALL: [SourceField; 10] = [
        SourceField::LastIssueDate,
        SourceField::LastPurchaseDate,
        SourceField::LastIssueQty,
        SourceField::StockQty,
        SourceField::StockValue,
        SourceField::Location,
        SourceField::PartCategory,
        SourceField::PartNumber,
        SourceField::AbcClass,
        SourceField::RisCode,
    ];

    /// A batch without these columns cannot be classified at all.
    pub fn is_required(&self) -> bool {
        matches!(self, SourceField::LastIssueDate | SourceField::LastPurchaseDate)
    }

    fn rule(&self) -> HeaderRule {
        match self {
            SourceField::LastIssueDate => HeaderRule::Contains {
                all: &["last", "issue", "date"],
                none: &[],
            },
            SourceField::LastPurchaseDate => HeaderRule::Contains {
                all: &["last", "purchase", "date"],
                none: &[],
            },
            SourceField::LastIssueQty => HeaderRule::Contains {
                all: &["last", "issue", "qty"],
                none: &[],
            },
            SourceField::StockQty => HeaderRule::Contains {
                all: &["stock", "qty"],
                none: &[],
            },
            SourceField::StockValue => HeaderRule::Contains {
                all: &["stock", "gndp"],
                none: &[],
            },
            SourceField::Location => HeaderRule::Contains {
                all: &["location"],
                none: &["dealer"],
            },
            SourceField::PartCategory => HeaderRule::Contains {
                all: &["part", "category"],
                none: &[],
            },
            SourceField::PartNumber => HeaderRule::Contains {
                all: &["part", "no"],
                none: &["description"],
            },
            SourceField::AbcClass => HeaderRule::Exact("ABC"),
            SourceField::RisCode => HeaderRule::Exact("RIS"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceField::LastIssueDate => "last issue date",
            SourceField::LastPurchaseDate => "last purchase date",
            SourceField::LastIssueQty => "last issue qty",
            SourceField::StockQty => "stock qty",
            SourceField::StockValue => "stock value (GNDP)",
            SourceField::Location => "location",
            SourceField::PartCategory => "part category",
            SourceField::PartNumber => "part number",
            SourceField::AbcClass => "ABC",
            SourceField::RisCode => "RIS",
        }
    }
}

impl fmt::Display for SourceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A header bound to a logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BoundColumn {
    pub field: SourceField,
    pub header: String,
    pub index: usize,
}

/// Header-to-field binding for one source table, resolved once per rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnMapping {
    pub columns: Vec<BoundColumn>,
}

impl ColumnMapping {
    /// Binds each field to the first header matching its rule.
    ///
    /// Fails with [`AgeingError::MissingRequiredColumns`] when either date
    /// column is absent; other absent fields are logged and left unbound.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self> {
        let mut columns = Vec::new();
        let mut missing = Vec::new();

        for field in SourceField::ALL {
            let rule = field.rule();
            let found = headers
                .iter()
                .enumerate()
                .find(|(_, header)| rule.matches(header.as_ref()));

            match found {
                Some((index, header)) => {
                    debug!("Bound {} to column '{}'", field, header.as_ref());
                    columns.push(BoundColumn {
                        field,
                        header: header.as_ref().to_string(),
                        index,
                    });
                }
                None if field.is_required() => missing.push(field.name().to_string()),
                None => warn!("No column found for {}; dependent features are disabled", field),
            }
        }

        if !missing.is_empty() {
            return Err(AgeingError::MissingRequiredColumns { missing });
        }

        Ok(Self { columns })
    }

    pub fn get(&self, field: SourceField) -> Option<&BoundColumn> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn index(&self, field: SourceField) -> Option<usize> {
        self.get(field).map(|c| c.index)
    }

    pub fn has(&self, field: SourceField) -> bool {
        self.get(field).is_some()
    }
}

/// Where to read source data from and which day to treat as "today".
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgeingConfig {
    #[schemars(description = "CSV export of the spares ageing report")]
    pub source_path: PathBuf,

    #[serde(default)]
    #[schemars(
        description = "Optional two-column CSV mapping part-number prefixes to vehicle model details"
    )]
    pub model_group_path: Option<PathBuf>,

    #[serde(default)]
    #[schemars(
        description = "Reference date for all classifications (YYYY-MM-DD). Defaults to the local calendar date at load time."
    )]
    pub reference_date: Option<NaiveDate>,
}

impl AgeingConfig {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            model_group_path: None,
            reference_date: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AgeingConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: [&str; 12] = [
        "Dealer Location",
        "Location",
        "Part No",
        "Part Description",
        "Part Category",
        "ABC",
        " ris ",
        "Stock Qty",
        "Stock at GNDP (Lac)",
        "Last Issue Date",
        "Last Issue Qty",
        "Last Purchase Date",
    ];

    #[test]
    fn test_resolve_binds_first_match() {
        let mapping = ColumnMapping::resolve(&HEADERS).unwrap();

        assert_eq!(mapping.get(SourceField::Location).unwrap().header, "Location");
        assert_eq!(mapping.index(SourceField::Location), Some(1));
        assert_eq!(mapping.index(SourceField::PartNumber), Some(2));
        assert_eq!(mapping.index(SourceField::PartCategory), Some(4));
        assert_eq!(mapping.index(SourceField::AbcClass), Some(5));
        assert_eq!(mapping.index(SourceField::RisCode), Some(6));
        assert_eq!(mapping.index(SourceField::StockQty), Some(7));
        assert_eq!(mapping.index(SourceField::StockValue), Some(8));
        assert_eq!(mapping.index(SourceField::LastIssueDate), Some(9));
        assert_eq!(mapping.index(SourceField::LastIssueQty), Some(10));
        assert_eq!(mapping.index(SourceField::LastPurchaseDate), Some(11));
    }

    #[test]
    fn test_resolve_missing_optional_columns() {
        let mapping =
            ColumnMapping::resolve(&["LAST ISSUE DATE", "Last Purchase Date", "Stock Qty"])
                .unwrap();

        assert!(mapping.has(SourceField::StockQty));
        assert!(!mapping.has(SourceField::AbcClass));
        assert!(!mapping.has(SourceField::Location));
        assert!(!mapping.has(SourceField::PartCategory));
    }

    #[test]
    fn test_resolve_missing_required_columns() {
        let err = ColumnMapping::resolve(&["Part No", "Stock Qty", "Last Issue Date"]).unwrap_err();
        match err {
            AgeingError::MissingRequiredColumns { missing } => {
                assert_eq!(missing, vec!["last purchase date".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_abc_requires_exact_header() {
        let mapping =
            ColumnMapping::resolve(&["Last Issue Date", "Last Purchase Date", "ABC Class"])
                .unwrap();
        assert!(!mapping.has(SourceField::AbcClass));
    }

    #[test]
    fn test_config_from_json() {
        let config = AgeingConfig::from_json_str(
            r#"{ "source_path": "data/ageing.csv", "reference_date": "2024-03-15" }"#,
        )
        .unwrap();

        assert_eq!(config.source_path, PathBuf::from("data/ageing.csv"));
        assert_eq!(config.model_group_path, None);
        assert_eq!(config.today(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn test_config_schema_generation() {
        let schema_json = AgeingConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("source_path"));
        assert!(schema_json.contains("reference_date"));
    }
}
