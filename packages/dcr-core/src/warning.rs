//! Non-fatal conditions attached to a table's outcome.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A condition worth surfacing to the operator that does not fail the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableWarning {
    /// Only the reduced "standard columns" view was available
    LegacySchema,
    /// Shape detection was suspicious; a best guess was used
    SchemaAmbiguous { reason: String },
    /// Source type not in the mapping table, coerced to string
    UnknownColumnType { column: String, source_type: String },
    /// Schema resolved but no columns survived filtering
    EmptySchema,
    /// Name shortened through the abbreviation table
    NameAbbreviated { from: String, to: String },
    /// Name shortened by generic truncation
    NameTruncated { from: String, to: String },
    /// Override hook gave up after invalid replacements
    OverrideAbandoned { attempts: u32 },
    /// Definition is large but still under the hard limit
    SizeWarning { bytes: usize },
    /// Definition exceeds the platform hard limit
    SizeExceeded { bytes: usize, limit: usize },
    /// Too many columns for a reliable automatic deployment
    ColumnCountExceeded { count: usize, limit: usize },
}

impl fmt::Display for TableWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableWarning::LegacySchema => {
                write!(f, "table uses the legacy standard-columns schema")
            }
            TableWarning::SchemaAmbiguous { reason } => write!(f, "ambiguous schema: {}", reason),
            TableWarning::UnknownColumnType {
                column,
                source_type,
            } => write!(
                f,
                "column '{}' has unknown type '{}', mapped to string",
                column, source_type
            ),
            TableWarning::EmptySchema => write!(f, "no columns left after filtering"),
            TableWarning::NameAbbreviated { from, to } => {
                write!(f, "name abbreviated from '{}' to '{}'", from, to)
            }
            TableWarning::NameTruncated { from, to } => {
                write!(f, "name truncated from '{}' to '{}'", from, to)
            }
            TableWarning::OverrideAbandoned { attempts } => write!(
                f,
                "name override abandoned after {} invalid attempts",
                attempts
            ),
            TableWarning::SizeWarning { bytes } => {
                write!(f, "definition is large ({} bytes)", bytes)
            }
            TableWarning::SizeExceeded { bytes, limit } => write!(
                f,
                "definition size {} bytes exceeds limit {} bytes",
                bytes, limit
            ),
            TableWarning::ColumnCountExceeded { count, limit } => {
                write!(f, "{} columns exceeds limit {}", count, limit)
            }
        }
    }
}
