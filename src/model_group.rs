//! Vehicle model lookup by part-number prefix.

use crate::error::{AgeingError, Result};
use log::info;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

const PART_PREFIX_HEADER: &str = "PART NO";
const MODEL_HEADER: &str = "VEHICLE DETAILS";

/// Longest prefix is tried first.
const PREFIX_LENGTHS: [usize; 3] = [4, 3, 2];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelGroupMap {
    prefixes: HashMap<String, String>,
}

impl ModelGroupMap {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let prefixes = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_uppercase(), v.as_ref().trim().to_string()))
            .collect();
        Self { prefixes }
    }

    /// Reads a CSV with `PART NO` and `Vehicle Details` columns (matched
    /// case-insensitively, surrounding spaces ignored).
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().to_uppercase() == name)
                .ok_or_else(|| {
                    AgeingError::InvalidModelGroupMapping(format!("missing '{}' column", name))
                })
        };
        let prefix_idx = position(PART_PREFIX_HEADER)?;
        let model_idx = position(MODEL_HEADER)?;

        let mut pairs = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            if let (Some(prefix), Some(model)) = (record.get(prefix_idx), record.get(model_idx)) {
                if !prefix.trim().is_empty() {
                    pairs.push((prefix.to_string(), model.to_string()));
                }
            }
        }

        let map = Self::from_pairs(pairs);
        info!("Loaded {} model group mappings", map.len());
        Ok(map)
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        Self::from_csv_reader(std::fs::File::open(path)?)
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Model details for a part number, or an empty string when no prefix matches.
    pub fn lookup(&self, part_number: Option<&str>) -> String {
        let Some(part) = part_number.map(|p| p.trim().to_uppercase()) else {
            return String::new();
        };

        let length = part.chars().count();
        PREFIX_LENGTHS
            .iter()
            .filter(|&&len| len <= length)
            .map(|&len| part.chars().take(len).collect::<String>())
            .find_map(|prefix| self.prefixes.get(&prefix))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_prefers_longest_prefix() {
        let map = ModelGroupMap::from_pairs([("AB", "Generic AB"), ("ab12", "Model X")]);

        assert_eq!(map.lookup(Some("ab1234")), "Model X");
        assert_eq!(map.lookup(Some("AB9999")), "Generic AB");
        assert_eq!(map.lookup(Some("ZZ0001")), "");
        assert_eq!(map.lookup(Some("A")), "");
        assert_eq!(map.lookup(None), "");
    }

    #[test]
    fn test_lookup_counts_characters_not_bytes() {
        let map = ModelGroupMap::from_pairs([("ÉAB1", "Export Model")]);
        assert_eq!(map.lookup(Some("éab12")), "Export Model");
        assert_eq!(map.lookup(Some("É")), "");
    }

    #[test]
    fn test_load_from_csv() {
        let csv_data = "\
PART NO ,Vehicle Details
K12,Scooter 110
K123,Scooter 125
,Orphan
";
        let map = ModelGroupMap::from_csv_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.lookup(Some("K1234-XX")), "Scooter 125");
        assert_eq!(map.lookup(Some("K129")), "Scooter 110");
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let err = ModelGroupMap::from_csv_reader("Prefix,Model\nK1,X\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AgeingError::InvalidModelGroupMapping(_)));
    }
}
