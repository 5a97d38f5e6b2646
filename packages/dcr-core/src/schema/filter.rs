//! System column exclusion.
//!
//! The filter only removes platform-managed columns. GUID-typed columns are
//! kept; the type mapper coerces them to `string`.

use super::{RawColumn, TableMode};

/// Billing/resource bookkeeping columns and the reserved `Type`
/// discriminator. Excluded in both modes.
const CUSTOM_EXCLUDED: &[&str] = &[
    "_ResourceId",
    "_SubscriptionId",
    "_ItemId",
    "_IsBillable",
    "_BilledSize",
    "_TimeReceived",
    "_Internal_WorkspaceResourceId",
    "Type",
];

/// Legacy/internal telemetry columns additionally excluded for native tables.
const NATIVE_EXCLUDED: &[&str] = &[
    "TenantId",
    "SourceSystem",
    "MG",
    "ManagementGroupName",
    "SourceComputerId",
    "PartitionKey",
    "RowKey",
    "StorageAccount",
    "AzureDeploymentID",
    "AzureTableName",
    "TimeCollected",
];

/// Returns true when `column_name` is a system column for `mode`.
pub fn is_excluded(column_name: &str, mode: TableMode) -> bool {
    let matches = |list: &[&str]| list.iter().any(|c| c.eq_ignore_ascii_case(column_name));
    match mode {
        TableMode::Custom => matches(CUSTOM_EXCLUDED),
        TableMode::Native => matches(CUSTOM_EXCLUDED) || matches(NATIVE_EXCLUDED),
    }
}

/// Removes system columns, preserving the order of the rest.
pub fn filter_columns(columns: &[RawColumn], mode: TableMode) -> Vec<RawColumn> {
    let kept: Vec<RawColumn> = columns
        .iter()
        .filter(|c| !is_excluded(&c.name, mode))
        .cloned()
        .collect();
    tracing::debug!(
        mode = %mode,
        total = columns.len(),
        kept = kept.len(),
        "Filtered system columns"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<RawColumn> {
        vec![
            RawColumn::new("TimeGenerated", "datetime"),
            RawColumn::new("TenantId", "guid"),
            RawColumn::new("SourceSystem", "string"),
            RawColumn::new("_ResourceId", "string"),
            RawColumn::new("type", "string"),
            RawColumn::new("CorrelationId", "guid"),
            RawColumn::new("Message", "string"),
        ]
    }

    fn names(columns: &[RawColumn]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_custom_mode_keeps_tenant_columns() {
        let kept = filter_columns(&sample(), TableMode::Custom);
        assert_eq!(
            names(&kept),
            [
                "TimeGenerated",
                "TenantId",
                "SourceSystem",
                "CorrelationId",
                "Message"
            ]
        );
    }

    #[test]
    fn test_native_mode_drops_legacy_columns() {
        let kept = filter_columns(&sample(), TableMode::Native);
        assert_eq!(names(&kept), ["TimeGenerated", "CorrelationId", "Message"]);
    }

    #[test]
    fn test_guid_columns_are_not_filtered() {
        let columns = vec![RawColumn::new("SessionId", "uniqueidentifier")];
        for mode in [TableMode::Native, TableMode::Custom] {
            assert_eq!(filter_columns(&columns, mode), columns);
        }
    }
}
