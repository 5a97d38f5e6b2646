//! Parsing of the remote schema document into a tagged [`SchemaShape`].
//!
//! The remote table API has exposed schemas in several generations:
//! a flat `columns` list, a legacy `standardColumns`-only view, and both of
//! these wrapped in a secondary `schema` object (optionally under a
//! `properties` envelope). All of them are parsed here, once, so that the
//! rest of the crate sees a single canonical column list.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use super::RawColumn;
use crate::error::{DcrError, Result};

/// Column entry as found in a schema document.
#[derive(Debug, Deserialize)]
struct ColumnEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type", alias = "dataType", alias = "columnType")]
    r#type: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Schema document members, before shape classification.
#[derive(Debug, Default, Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    columns: Option<Vec<ColumnEntry>>,
    #[serde(default, rename = "standardColumns", alias = "standard_columns")]
    standard_columns: Option<Vec<ColumnEntry>>,
    #[serde(default)]
    schema: Option<Box<SchemaDocument>>,
    #[serde(default)]
    properties: Option<Box<SchemaDocument>>,
}

/// The `columns` / `standardColumns` pair of one document level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeMembers {
    /// Flat column list, `None` when the member is absent
    pub columns: Option<Vec<RawColumn>>,
    /// Legacy standard columns, `None` when the member is absent
    pub standard_columns: Option<Vec<RawColumn>>,
}

impl ShapeMembers {
    fn has_flat(&self) -> bool {
        self.columns.as_ref().is_some_and(|c| !c.is_empty())
    }

    fn has_standard(&self) -> bool {
        self.standard_columns.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// Which known remote representation a schema used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaShape {
    /// Full column list, plus any standard columns reported beside it
    FlatColumns {
        columns: Vec<RawColumn>,
        standard_columns: Vec<RawColumn>,
    },
    /// Legacy reduced view
    StandardColumnsOnly(Vec<RawColumn>),
    /// Members wrapped in a secondary `schema` object
    NestedSchema {
        outer: ShapeMembers,
        nested: ShapeMembers,
    },
}

/// Shape discriminant without payload, for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    FlatColumns,
    StandardColumnsOnly,
    NestedSchema,
}

impl SchemaShape {
    /// Parses a schema document into its shape.
    ///
    /// Accepts `{columns, standardColumns}`, `{schema: {...}}` and
    /// `{properties: {schema: {...}}}`. Column entries without a name are
    /// dropped.
    pub fn parse(document: &Value) -> Result<SchemaShape> {
        let mut doc: SchemaDocument = serde_json::from_value(document.clone())
            .map_err(|e| DcrError::SerializationError(format!("Invalid schema document: {}", e)))?;

        while let Some(properties) = doc.properties.take() {
            let outer = std::mem::take(&mut doc);
            doc = merge_envelope(outer, *properties);
        }

        let outer = ShapeMembers {
            columns: doc.columns.map(convert_entries),
            standard_columns: doc.standard_columns.map(convert_entries),
        };

        match doc.schema {
            Some(nested) => Ok(SchemaShape::NestedSchema {
                outer,
                nested: ShapeMembers {
                    columns: nested.columns.map(convert_entries),
                    standard_columns: nested.standard_columns.map(convert_entries),
                },
            }),
            None => Ok(classify(outer)),
        }
    }

    /// Reduces a nested shape by copying the nested `columns` /
    /// `standardColumns` members up one level where the outer level lacks
    /// them. Other shapes are returned unchanged.
    pub fn flatten(self) -> SchemaShape {
        match self {
            SchemaShape::NestedSchema { mut outer, nested } => {
                let lift_flat = !outer.has_flat() && nested.has_flat();
                let lift_standard = !outer.has_standard() && nested.has_standard();
                let ShapeMembers {
                    columns,
                    standard_columns,
                } = nested;
                if lift_flat {
                    outer.columns = columns;
                }
                if lift_standard {
                    outer.standard_columns = standard_columns;
                }
                classify(outer)
            }
            other => other,
        }
    }

    /// Shape discriminant.
    pub fn kind(&self) -> ShapeKind {
        match self {
            SchemaShape::FlatColumns { .. } => ShapeKind::FlatColumns,
            SchemaShape::StandardColumnsOnly(_) => ShapeKind::StandardColumnsOnly,
            SchemaShape::NestedSchema { .. } => ShapeKind::NestedSchema,
        }
    }

    /// Canonical column list of a flattened shape: standard columns first,
    /// then flat columns, deduplicated case-insensitively (first wins).
    pub fn into_columns(self) -> Vec<RawColumn> {
        let combined = match self.flatten() {
            SchemaShape::FlatColumns {
                columns,
                standard_columns,
            } => standard_columns.into_iter().chain(columns).collect(),
            SchemaShape::StandardColumnsOnly(columns) => columns,
            SchemaShape::NestedSchema { .. } => Vec::new(),
        };
        dedupe(combined)
    }
}

/// Merges a `properties` envelope into the enclosing document; members
/// already present at the outer level win.
fn merge_envelope(outer: SchemaDocument, inner: SchemaDocument) -> SchemaDocument {
    SchemaDocument {
        columns: outer.columns.or(inner.columns),
        standard_columns: outer.standard_columns.or(inner.standard_columns),
        schema: outer.schema.or(inner.schema),
        properties: inner.properties,
    }
}

fn classify(members: ShapeMembers) -> SchemaShape {
    if members.has_flat() {
        SchemaShape::FlatColumns {
            columns: members.columns.unwrap_or_default(),
            standard_columns: members.standard_columns.unwrap_or_default(),
        }
    } else if members.has_standard() {
        SchemaShape::StandardColumnsOnly(members.standard_columns.unwrap_or_default())
    } else {
        SchemaShape::FlatColumns {
            columns: Vec::new(),
            standard_columns: Vec::new(),
        }
    }
}

fn convert_entries(entries: Vec<ColumnEntry>) -> Vec<RawColumn> {
    let total = entries.len();
    let columns: Vec<RawColumn> = entries
        .into_iter()
        .filter_map(|entry| {
            let name = entry.name.map(|n| n.trim().to_string())?;
            if name.is_empty() {
                return None;
            }
            Some(RawColumn {
                name,
                r#type: entry.r#type.unwrap_or_default(),
                description: entry.description,
            })
        })
        .collect();
    if columns.len() != total {
        tracing::warn!(
            dropped = total - columns.len(),
            "Dropped schema column entries without a name"
        );
    }
    columns
}

fn dedupe(columns: Vec<RawColumn>) -> Vec<RawColumn> {
    let mut seen = HashSet::new();
    columns
        .into_iter()
        .filter(|c| seen.insert(c.name.to_ascii_lowercase()))
        .collect()
}
