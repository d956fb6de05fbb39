//! Declared column layout of headerless shard payloads and the projected record type

use csv::StringRecord;
use std::collections::HashSet;
use thiserror::Error;

/// Full positional column list of a GDELT 2.0 Global Knowledge Graph shard
pub const GKG_COLUMNS: &[&str] = &[
    "GKGRECORDID",
    "DATE",
    "SourceCollectionIdentifier",
    "SourceCommonName",
    "DocumentIdentifier",
    "Counts",
    "V2Counts",
    "Themes",
    "V2Themes",
    "Locations",
    "V2Locations",
    "Persons",
    "V2Persons",
    "Organizations",
    "V2Organizations",
    "V2Tone",
    "Dates",
    "GCAM",
    "SharingImage",
    "RelatedImages",
    "SocialImageEmbeds",
    "SocialVideoEmbeds",
    "Quotations",
    "AllNames",
    "Amounts",
    "TranslationInfo",
    "Extras",
];

/// Columns materialized from each GKG row
pub const GKG_USECOLS: &[&str] = &[
    "GKGRECORDID",
    "DATE",
    "SourceCollectionIdentifier",
    "SourceCommonName",
    "DocumentIdentifier",
    "Counts",
    "V2Counts",
    "V2Locations",
    "V2Persons",
    "V2Organizations",
    "Dates",
    "SharingImage",
    "RelatedImages",
    "SocialImageEmbeds",
    "SocialVideoEmbeds",
    "Quotations",
    "AllNames",
    "Amounts",
    "TranslationInfo",
    "Extras",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no columns")]
    Empty,
    #[error("column '{0}' is declared more than once")]
    DuplicateColumn(String),
    #[error("usecol '{0}' is not a declared column")]
    UnknownColumn(String),
    #[error("usecols selects no columns")]
    NoUsecols,
}

/// Positional schema with a projection.
///
/// `usecols` is kept in payload order regardless of the order it was declared in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
    usecols: Vec<String>,
    positions: Vec<usize>,
}

impl Schema {
    pub fn new(columns: Vec<String>, usecols: Vec<String>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }
        if usecols.is_empty() {
            return Err(SchemaError::NoUsecols);
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(SchemaError::DuplicateColumn(column.clone()));
            }
        }

        let mut positions = Vec::with_capacity(usecols.len());
        for name in &usecols {
            let position = columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| SchemaError::UnknownColumn(name.clone()))?;
            if !positions.contains(&position) {
                positions.push(position);
            }
        }
        positions.sort_unstable();

        let usecols = positions.iter().map(|&i| columns[i].clone()).collect();

        Ok(Self {
            columns,
            usecols,
            positions,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn usecols(&self) -> &[String] {
        &self.usecols
    }

    /// Assign column identity by position and keep only the usecols.
    ///
    /// Short rows yield empty values for the missing trailing columns; cells
    /// past the declared columns are ignored.
    pub fn project(&self, row: &StringRecord) -> RawRecord {
        let values = self
            .positions
            .iter()
            .map(|&i| row.get(i).unwrap_or_default().to_string())
            .collect();
        RawRecord { values }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.usecols.iter().position(|c| c == name)
    }
}

/// One projected row, values in the order of [`Schema::usecols`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    values: Vec<String>,
}

impl RawRecord {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn get<'a>(&'a self, schema: &Schema, name: &str) -> Option<&'a str> {
        schema
            .index_of(name)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_gkg_layout_is_valid() {
        let built = Schema::new(strings(GKG_COLUMNS), strings(GKG_USECOLS)).unwrap();
        assert_eq!(built.usecols(), strings(GKG_USECOLS).as_slice());
        assert_eq!(built.columns().len(), 27);
        assert_eq!(built.usecols().len(), 20);
    }

    #[test]
    fn test_projection_follows_payload_order() {
        let schema = Schema::new(strings(&["A", "B", "C", "D"]), strings(&["D", "B"])).unwrap();
        assert_eq!(schema.usecols(), &["B", "D"]);

        let row = StringRecord::from(vec!["a", "b", "c", "d"]);
        let record = schema.project(&row);
        assert_eq!(record.values(), &["b", "d"]);
        assert_eq!(record.get(&schema, "D"), Some("d"));
        assert_eq!(record.get(&schema, "A"), None);
    }

    #[test]
    fn test_short_row_fills_blanks() {
        let schema = Schema::new(strings(&["A", "B", "C"]), strings(&["A", "C"])).unwrap();
        let row = StringRecord::from(vec!["only-a"]);
        assert_eq!(schema.project(&row).values(), &["only-a", ""]);
    }

    #[test]
    fn test_rejects_bad_layouts() {
        assert_eq!(Schema::new(vec![], strings(&["A"])), Err(SchemaError::Empty));
        assert_eq!(
            Schema::new(strings(&["A", "A"]), strings(&["A"])),
            Err(SchemaError::DuplicateColumn("A".to_string()))
        );
        assert_eq!(
            Schema::new(strings(&["A"]), strings(&["B"])),
            Err(SchemaError::UnknownColumn("B".to_string()))
        );
        assert_eq!(Schema::new(strings(&["A"]), vec![]), Err(SchemaError::NoUsecols));
    }
}
