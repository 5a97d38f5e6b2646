//! Shared fixtures.

use serde_json::{json, Value};

use dcr_core::advisor::{assess, DeploymentVerdict};
use dcr_core::error::Result;
use dcr_core::naming::{NameConstraint, NameResolver};
use dcr_core::schema::{SchemaResolver, TableMode};
use dcr_core::template::{ResourceDefinition, TemplateSynthesizer};
use dcr_core::warning::TableWarning;

/// Flat document with one column per `(name, type)` pair.
pub fn flat_document(columns: &[(&str, &str)]) -> Value {
    let columns: Vec<Value> = columns
        .iter()
        .map(|(name, ty)| json!({ "name": name, "type": ty }))
        .collect();
    json!({ "columns": columns })
}

/// A document with `count` string columns.
pub fn wide_document(count: usize) -> Value {
    let columns: Vec<Value> = (0..count)
        .map(|i| json!({ "name": format!("Field{:04}", i), "type": "string" }))
        .collect();
    json!({ "columns": columns })
}

/// Output of running one table through every core stage.
#[derive(Debug)]
pub struct PipelineOutput {
    pub definition: ResourceDefinition,
    pub verdict: DeploymentVerdict,
    pub warnings: Vec<TableWarning>,
}

/// Runs resolve, filter, map, name, synthesize and assess, serving the
/// documents in `known` by exact table name.
pub fn run_pipeline(
    table: &str,
    mode: TableMode,
    known: &[(&str, Value)],
) -> Result<PipelineOutput> {
    let resolver = SchemaResolver::new(mode);
    let resolution = resolver.resolve(table, |name| {
        Ok(known
            .iter()
            .find(|(known_name, _)| *known_name == name)
            .map(|(_, doc)| doc.clone()))
    })?;
    let schema = resolution.into_schema();
    let (columns, mut warnings) = schema.normalize(mode);

    let naming = NameResolver::new(NameConstraint::default());
    let name = naming.resolve(&schema.table_name, None)?;
    warnings.extend(name.warnings);

    let definition = TemplateSynthesizer::new("westeurope", "/workspaces/law", None).synthesize(
        &schema.table_name,
        mode,
        &name.name,
        columns,
    );
    let verdict = assess(&definition, definition.serialized_size()?);
    warnings.extend(verdict.warnings.iter().cloned());

    Ok(PipelineOutput {
        definition,
        verdict,
        warnings,
    })
}
