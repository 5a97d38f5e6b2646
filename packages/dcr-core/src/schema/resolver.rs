//! Schema resolution: name variant probing and shape normalization.

use serde_json::Value;

use super::shape::{SchemaShape, ShapeKind};
use super::{filter, normalize_columns, NormalizedColumn, RawColumn, TableMode};
use crate::error::{DcrError, Result};
use crate::warning::TableWarning;

/// Suffix carried by user-defined tables.
pub const CUSTOM_TABLE_SUFFIX: &str = "_CL";

/// Column name that, alone in a legacy view, signals a misdetected table.
const TENANT_SENTINEL: &str = "TenantId";

/// A resolved table schema in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    /// Identifier the caller asked for
    pub requested: String,
    /// Name variant that exists remotely
    pub table_name: String,
    /// Shape the remote document used
    pub shape: ShapeKind,
    /// Canonical raw column list, unfiltered
    pub columns: Vec<RawColumn>,
    /// Non-fatal conditions met while resolving
    pub warnings: Vec<TableWarning>,
}

impl ResolvedSchema {
    /// Filters system columns for `mode` and maps types.
    ///
    /// Returns the normalized columns and the warnings produced on the way,
    /// which include the resolution warnings.
    pub fn normalize(&self, mode: TableMode) -> (Vec<NormalizedColumn>, Vec<TableWarning>) {
        let mut warnings = self.warnings.clone();
        let kept = filter::filter_columns(&self.columns, mode);
        let columns = normalize_columns(&kept, &mut warnings);
        if columns.is_empty() {
            warnings.push(TableWarning::EmptySchema);
        }
        (columns, warnings)
    }
}

/// Outcome of a successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Schema resolved cleanly (possibly with warnings)
    Resolved(ResolvedSchema),
    /// Shape detection was suspicious; `best_guess` is usable
    Ambiguous {
        best_guess: ResolvedSchema,
        reason: String,
    },
}

impl Resolution {
    /// Returns the schema to continue with, whichever variant this is.
    pub fn into_schema(self) -> ResolvedSchema {
        match self {
            Resolution::Resolved(schema) => schema,
            Resolution::Ambiguous { best_guess, .. } => best_guess,
        }
    }

    /// Returns the schema, treating ambiguity as an error.
    pub fn into_strict(self) -> Result<ResolvedSchema> {
        match self {
            Resolution::Resolved(schema) => Ok(schema),
            Resolution::Ambiguous { best_guess, reason } => Err(DcrError::SchemaAmbiguous {
                table: best_guess.requested,
                reason,
            }),
        }
    }

    /// True for [`Resolution::Ambiguous`].
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Resolution::Ambiguous { .. })
    }
}

/// Resolves a table identifier to a canonical column list.
///
/// The resolver never talks to the remote side itself; callers pass a
/// `fetch` closure (name variant -> document, `None` when absent) that
/// carries their transport and retry policy.
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver {
    mode: TableMode,
}

impl SchemaResolver {
    /// Creates a resolver for `mode`.
    pub fn new(mode: TableMode) -> Self {
        Self { mode }
    }

    /// Table mode this resolver probes for.
    pub fn mode(&self) -> TableMode {
        self.mode
    }

    /// Name variants to probe, in precedence order.
    ///
    /// Custom mode tries the `_CL` variant first so a same-named native
    /// table is never picked up. Native mode never probes the `_CL` variant.
    pub fn candidate_names(&self, table: &str) -> Vec<String> {
        let table = table.trim();
        if table.is_empty() {
            return Vec::new();
        }
        let stem = strip_custom_suffix(table);
        match self.mode {
            TableMode::Custom if stem.len() != table.len() => vec![table.to_string()],
            TableMode::Custom => vec![format!("{}{}", table, CUSTOM_TABLE_SUFFIX), table.to_string()],
            TableMode::Native => vec![stem.to_string()],
        }
    }

    /// Probes the name variants and normalizes the first schema found.
    ///
    /// # Errors
    /// `SchemaNotFound` when no variant exists; fetch and parse errors are
    /// propagated unchanged.
    pub fn resolve<F>(&self, table: &str, mut fetch: F) -> Result<Resolution>
    where
        F: FnMut(&str) -> Result<Option<Value>>,
    {
        let candidates = self.candidate_names(table);
        for candidate in &candidates {
            tracing::debug!(table, candidate = %candidate, "Probing table schema");
            let Some(document) = fetch(candidate.as_str())? else {
                continue;
            };
            return self.resolve_document(table, candidate, &document, &mut fetch);
        }

        Err(DcrError::SchemaNotFound {
            table: table.to_string(),
            probed: candidates.join(", "),
        })
    }

    fn resolve_document<F>(
        &self,
        requested: &str,
        table_name: &str,
        document: &Value,
        fetch: &mut F,
    ) -> Result<Resolution>
    where
        F: FnMut(&str) -> Result<Option<Value>>,
    {
        let shape = SchemaShape::parse(document)?;
        let kind = shape.kind();
        let flat = shape.flatten();

        let mut schema = ResolvedSchema {
            requested: requested.to_string(),
            table_name: table_name.to_string(),
            shape: kind,
            columns: Vec::new(),
            warnings: Vec::new(),
        };

        let legacy = match &flat {
            SchemaShape::StandardColumnsOnly(columns) => Some(columns.clone()),
            _ => None,
        };
        let Some(legacy_columns) = legacy else {
            schema.columns = flat.into_columns();
            return Ok(Resolution::Resolved(schema));
        };

        tracing::debug!(table = table_name, "Table uses the legacy standard-columns schema");
        schema.warnings.push(TableWarning::LegacySchema);

        if self.mode == TableMode::Native && is_tenant_sentinel(&legacy_columns) {
            return self.reattempt_flat(schema, legacy_columns, fetch);
        }

        schema.columns = flat.into_columns();
        Ok(Resolution::Resolved(schema))
    }

    /// A legacy view holding only the tenant column usually means the probe
    /// hit a differently-named table sharing the prefix. Read the table once
    /// more and accept it only if it now exposes a flat column list.
    fn reattempt_flat<F>(
        &self,
        mut schema: ResolvedSchema,
        legacy_columns: Vec<RawColumn>,
        fetch: &mut F,
    ) -> Result<Resolution>
    where
        F: FnMut(&str) -> Result<Option<Value>>,
    {
        let reason = format!(
            "legacy view of '{}' holds only the {} column",
            schema.table_name, TENANT_SENTINEL
        );
        tracing::debug!(table = %schema.table_name, "{}, re-reading flat columns", reason);

        if let Some(document) = fetch(schema.table_name.as_str())? {
            let flat = SchemaShape::parse(&document)?.flatten();
            if matches!(flat, SchemaShape::FlatColumns { .. }) {
                let columns = flat.into_columns();
                if !columns.is_empty() {
                    schema.shape = ShapeKind::FlatColumns;
                    schema.columns = columns;
                    schema.warnings.retain(|w| *w != TableWarning::LegacySchema);
                    schema.warnings.push(TableWarning::SchemaAmbiguous { reason });
                    return Ok(Resolution::Resolved(schema));
                }
            }
        }

        schema.columns = legacy_columns;
        schema.warnings.push(TableWarning::SchemaAmbiguous {
            reason: reason.clone(),
        });
        Ok(Resolution::Ambiguous {
            best_guess: schema,
            reason,
        })
    }
}

fn strip_custom_suffix(table: &str) -> &str {
    let len = table.len();
    if len > CUSTOM_TABLE_SUFFIX.len()
        && table.is_char_boundary(len - CUSTOM_TABLE_SUFFIX.len())
        && table[len - CUSTOM_TABLE_SUFFIX.len()..].eq_ignore_ascii_case(CUSTOM_TABLE_SUFFIX)
    {
        &table[..len - CUSTOM_TABLE_SUFFIX.len()]
    } else {
        table
    }
}

fn is_tenant_sentinel(columns: &[RawColumn]) -> bool {
    columns.len() == 1 && columns[0].name.eq_ignore_ascii_case(TENANT_SENTINEL)
}
