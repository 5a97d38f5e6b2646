//! Table schema model: raw columns, normalized columns, table modes and the
//! remote schema shapes they are parsed from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{self, TargetType};
use crate::warning::TableWarning;

pub mod filter;
pub mod resolver;
pub mod shape;

pub use filter::{filter_columns, is_excluded};
pub use resolver::{Resolution, ResolvedSchema, SchemaResolver, CUSTOM_TABLE_SUFFIX};
pub use shape::{SchemaShape, ShapeKind, ShapeMembers};

/// Column as received from the remote schema source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    /// Column name
    pub name: String,
    /// Unconstrained, case-insensitive source type
    #[serde(rename = "type")]
    pub r#type: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RawColumn {
    /// Creates a column without description.
    pub fn new(name: impl Into<String>, r#type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            r#type: r#type.into(),
            description: None,
        }
    }
}

/// Column as declared in a DCR stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedColumn {
    /// Column name
    pub name: String,
    /// Target type, never GUID-family
    #[serde(rename = "type")]
    pub r#type: TargetType,
}

/// Whether a table is platform-predefined or user-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableMode {
    Native,
    Custom,
}

impl TableMode {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableMode::Native => "native",
            TableMode::Custom => "custom",
        }
    }
}

impl fmt::Display for TableMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(TableMode::Native),
            "custom" => Ok(TableMode::Custom),
            other => Err(format!(
                "unknown table mode '{}', expected 'native' or 'custom'",
                other
            )),
        }
    }
}

/// Maps filtered raw columns to normalized columns.
///
/// GUID-family types become `string` under the same name. Unknown types
/// become `string` and add a [`TableWarning::UnknownColumnType`].
pub fn normalize_columns(
    columns: &[RawColumn],
    warnings: &mut Vec<TableWarning>,
) -> Vec<NormalizedColumn> {
    columns
        .iter()
        .map(|column| {
            let mapping = types::classify(&column.r#type);
            if !mapping.recognized {
                tracing::debug!(
                    column = %column.name,
                    source_type = %column.r#type,
                    "Unknown source column type, mapping to string"
                );
                warnings.push(TableWarning::UnknownColumnType {
                    column: column.name.clone(),
                    source_type: column.r#type.clone(),
                });
            }
            NormalizedColumn {
                name: column.name.clone(),
                r#type: mapping.target,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_uniqueidentifier_session_id() {
        let mut warnings = Vec::new();
        let normalized =
            normalize_columns(&[RawColumn::new("SessionId", "uniqueidentifier")], &mut warnings);
        assert_eq!(
            normalized,
            vec![NormalizedColumn {
                name: "SessionId".to_string(),
                r#type: TargetType::String,
            }]
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_type_adds_warning() {
        let mut warnings = Vec::new();
        let normalized = normalize_columns(&[RawColumn::new("Shape", "geography")], &mut warnings);
        assert_eq!(normalized[0].r#type, TargetType::String);
        assert_eq!(
            warnings,
            vec![TableWarning::UnknownColumnType {
                column: "Shape".into(),
                source_type: "geography".into(),
            }]
        );
    }

    #[test]
    fn test_table_mode_parse() {
        assert_eq!("Native".parse::<TableMode>().unwrap(), TableMode::Native);
        assert_eq!(" custom ".parse::<TableMode>().unwrap(), TableMode::Custom);
        assert!("both".parse::<TableMode>().is_err());
    }

    proptest! {
        #[test]
        fn prop_guid_columns_are_kept_as_string(
            name in "[A-Za-z][A-Za-z0-9_]{0,20}",
            source in prop::sample::select(vec!["guid", "GUID", "uniqueidentifier", "Uuid"]),
        ) {
            let mut warnings = Vec::new();
            let normalized = normalize_columns(&[RawColumn::new(name.clone(), source)], &mut warnings);
            prop_assert_eq!(normalized.len(), 1);
            prop_assert_eq!(&normalized[0].name, &name);
            prop_assert_eq!(normalized[0].r#type, TargetType::String);
        }
    }
}
