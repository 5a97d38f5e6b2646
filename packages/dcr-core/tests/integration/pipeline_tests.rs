//! Schema document to template, end to end.

use serde_json::json;

use dcr_core::advisor::ComplexityTier;
use dcr_core::error::DcrError;
use dcr_core::schema::TableMode;
use dcr_core::types::TargetType;
use dcr_core::warning::TableWarning;

use super::helpers::{flat_document, run_pipeline, wide_document};

#[test]
fn test_custom_table_filters_system_columns_and_keeps_guids() {
    let document = flat_document(&[
        ("TimeGenerated", "datetime"),
        ("SessionId", "uniqueidentifier"),
        ("CorrelationId", "guid"),
        ("_ResourceId", "string"),
        ("TenantId", "string"),
        ("Type", "string"),
        ("Count", "Int64"),
    ]);
    let output = run_pipeline("Contoso", TableMode::Custom, &[("Contoso_CL", document)]).unwrap();

    let definition = &output.definition;
    assert_eq!(definition.table_name, "Contoso_CL");
    assert_eq!(definition.input_stream, "Custom-Contoso_CL");
    assert_eq!(definition.output_stream, "Custom-Contoso_CL");

    let names: Vec<&str> = definition.columns.iter().map(|c| c.name.as_str()).collect();
    // TenantId is only a system column for native tables.
    assert_eq!(
        names,
        ["TimeGenerated", "SessionId", "CorrelationId", "TenantId", "Count"]
    );
    assert_eq!(definition.columns[1].r#type, TargetType::String);
    assert_eq!(definition.columns[2].r#type, TargetType::String);
    assert_eq!(definition.columns[4].r#type, TargetType::Long);
    assert!(output.verdict.auto_deployable);
    assert_eq!(output.verdict.complexity_tier, ComplexityTier::Low);
    assert!(output.warnings.is_empty());
}

#[test]
fn test_native_table_uses_reserved_egress() {
    let document = json!({
        "properties": {
            "schema": {
                "columns": [
                    { "name": "TimeGenerated", "type": "datetime" },
                    { "name": "Computer", "type": "string" },
                    { "name": "TenantId", "type": "string" },
                    { "name": "SourceSystem", "type": "string" }
                ]
            }
        }
    });
    let output = run_pipeline("Syslog", TableMode::Native, &[("Syslog", document)]).unwrap();

    assert_eq!(output.definition.output_stream, "Microsoft-Syslog");
    let names: Vec<&str> = output
        .definition
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, ["TimeGenerated", "Computer"]);
}

#[test]
fn test_missing_table_reports_probed_names() {
    let err = run_pipeline("Ghost", TableMode::Custom, &[]).unwrap_err();
    match err {
        DcrError::SchemaNotFound { table, probed } => {
            assert_eq!(table, "Ghost");
            assert_eq!(probed, "Ghost_CL, Ghost");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_legacy_schema_still_synthesizes() {
    let document = json!({
        "standardColumns": [
            { "name": "TimeGenerated", "type": "datetime" },
            { "name": "RawData", "type": "string" }
        ]
    });
    let output = run_pipeline("Legacy_CL", TableMode::Custom, &[("Legacy_CL", document)]).unwrap();
    assert_eq!(output.definition.columns.len(), 2);
    assert!(output.warnings.contains(&TableWarning::LegacySchema));
}

#[test]
fn test_wide_table_goes_to_manual_path() {
    let output = run_pipeline("Wide_CL", TableMode::Custom, &[("Wide_CL", wide_document(320))])
        .unwrap();
    assert!(!output.verdict.auto_deployable);
    assert_eq!(output.verdict.column_count, 320);
    assert!(output
        .warnings
        .iter()
        .any(|w| matches!(w, TableWarning::ColumnCountExceeded { count: 320, .. })));
}

#[test]
fn test_only_system_columns_yields_empty_schema_warning() {
    let document = flat_document(&[("_ResourceId", "string"), ("_ItemId", "string")]);
    let output = run_pipeline("Bare_CL", TableMode::Custom, &[("Bare_CL", document)]).unwrap();
    assert!(output.definition.columns.is_empty());
    assert!(output.warnings.contains(&TableWarning::EmptySchema));
}
