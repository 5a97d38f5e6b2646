//! Data Collection Rule synthesis.
//!
//! A [`ResourceDefinition`] embeds the full column list in its stream
//! declaration, so the rendered template deploys without the schema fetch
//! that produced it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{DcrError, Result};
use crate::schema::{NormalizedColumn, TableMode};

/// Ingress streams are always declared under this prefix.
pub const INGRESS_STREAM_PREFIX: &str = "Custom-";

/// Reserved egress prefix for platform tables.
pub const NATIVE_EGRESS_PREFIX: &str = "Microsoft-";

/// Resource type of a DCR.
pub const DCR_RESOURCE_TYPE: &str = "Microsoft.Insights/dataCollectionRules";

const DCR_API_VERSION: &str = "2023-03-11";
const TEMPLATE_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#";
const DESTINATION_NAME: &str = "logAnalyticsWorkspace";

/// Ingress stream name for a table.
pub fn ingress_stream(table: &str) -> String {
    format!("{}{}", INGRESS_STREAM_PREFIX, table)
}

/// Egress stream name for a table. Custom tables may not use the reserved
/// prefix, so they egress under the ingress convention.
pub fn egress_stream(table: &str, mode: TableMode) -> String {
    match mode {
        TableMode::Native => format!("{}{}", NATIVE_EGRESS_PREFIX, table),
        TableMode::Custom => ingress_stream(table),
    }
}

/// A synthesized, self-contained DCR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Resolved DCR name
    pub name: String,
    /// Azure region
    pub location: String,
    /// Remote table the rule feeds
    pub table_name: String,
    /// Mode the table was processed under
    pub mode: TableMode,
    /// Log Analytics workspace resource id
    pub workspace_ref: String,
    /// Stream declared for ingestion
    pub input_stream: String,
    /// Stream the data flow writes to
    pub output_stream: String,
    /// Declared columns
    pub columns: Vec<NormalizedColumn>,
    /// Optional DCE resource id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_ref: Option<String>,
}

impl ResourceDefinition {
    /// Renders the ARM deployment template.
    pub fn to_template(&self) -> Value {
        let mut declarations = Map::new();
        declarations.insert(
            self.input_stream.clone(),
            json!({ "columns": self.columns }),
        );

        let mut properties = json!({
            "streamDeclarations": declarations,
            "destinations": {
                "logAnalytics": [{
                    "workspaceResourceId": self.workspace_ref,
                    "name": DESTINATION_NAME,
                }]
            },
            "dataFlows": [{
                "streams": [self.input_stream],
                "destinations": [DESTINATION_NAME],
                "transformKql": "source",
                "outputStream": self.output_stream,
            }],
        });

        let mut resource = json!({
            "type": DCR_RESOURCE_TYPE,
            "apiVersion": DCR_API_VERSION,
            "name": self.name,
            "location": self.location,
        });

        match &self.endpoint_ref {
            Some(endpoint) => {
                properties["dataCollectionEndpointId"] = json!(endpoint);
            }
            None => {
                resource["kind"] = json!("Direct");
            }
        }
        resource["properties"] = properties;

        json!({
            "$schema": TEMPLATE_SCHEMA,
            "contentVersion": "1.0.0.0",
            "resources": [resource],
            "outputs": {
                "dataCollectionRuleId": {
                    "type": "string",
                    "value": format!("[resourceId('{}', '{}')]", DCR_RESOURCE_TYPE, self.name),
                }
            }
        })
    }

    /// Pretty-printed template, as written to the artifact store.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_template())?)
    }

    /// Size in bytes of the pretty-printed template.
    pub fn serialized_size(&self) -> Result<usize> {
        Ok(self.to_json_pretty()?.len())
    }

    /// Reads a definition back from a rendered template.
    pub fn from_template(template: &Value) -> Result<Self> {
        let invalid = |what: &str| DcrError::SerializationError(format!("Template {}", what));

        let resource = template
            .get("resources")
            .and_then(Value::as_array)
            .and_then(|r| {
                r.iter()
                    .find(|res| res.get("type").and_then(Value::as_str) == Some(DCR_RESOURCE_TYPE))
            })
            .ok_or_else(|| invalid("has no data collection rule resource"))?;
        let text = |value: Option<&Value>, what: &str| {
            value
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| invalid(what))
        };

        let properties = resource
            .get("properties")
            .ok_or_else(|| invalid("resource has no properties"))?;
        let flow = properties
            .pointer("/dataFlows/0")
            .ok_or_else(|| invalid("has no data flow"))?;
        let input_stream = text(flow.pointer("/streams/0"), "data flow has no stream")?;
        let output_stream = text(flow.get("outputStream"), "data flow has no output stream")?;
        let columns_value = properties
            .get("streamDeclarations")
            .and_then(|d| d.get(&input_stream))
            .and_then(|d| d.get("columns"))
            .cloned()
            .ok_or_else(|| invalid("declares no columns for the input stream"))?;
        let columns: Vec<NormalizedColumn> = serde_json::from_value(columns_value)?;

        let (mode, table_name) = match output_stream.strip_prefix(NATIVE_EGRESS_PREFIX) {
            Some(table) => (TableMode::Native, table.to_string()),
            None => (
                TableMode::Custom,
                output_stream
                    .strip_prefix(INGRESS_STREAM_PREFIX)
                    .unwrap_or(&output_stream)
                    .to_string(),
            ),
        };

        Ok(ResourceDefinition {
            name: text(resource.get("name"), "resource has no name")?,
            location: text(resource.get("location"), "resource has no location")?,
            table_name,
            mode,
            workspace_ref: text(
                properties.pointer("/destinations/logAnalytics/0/workspaceResourceId"),
                "has no workspace destination",
            )?,
            input_stream,
            output_stream,
            columns,
            endpoint_ref: properties
                .get("dataCollectionEndpointId")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

/// Builds [`ResourceDefinition`]s for one target location and workspace.
#[derive(Debug, Clone)]
pub struct TemplateSynthesizer {
    location: String,
    workspace_ref: String,
    endpoint_ref: Option<String>,
}

impl TemplateSynthesizer {
    /// Creates a synthesizer.
    pub fn new(
        location: impl Into<String>,
        workspace_ref: impl Into<String>,
        endpoint_ref: Option<String>,
    ) -> Self {
        Self {
            location: location.into(),
            workspace_ref: workspace_ref.into(),
            endpoint_ref,
        }
    }

    /// Uses a different workspace for subsequent definitions.
    pub fn with_workspace(mut self, workspace_ref: impl Into<String>) -> Self {
        self.workspace_ref = workspace_ref.into();
        self
    }

    /// Synthesizes the definition for `table`.
    pub fn synthesize(
        &self,
        table: &str,
        mode: TableMode,
        resolved_name: &str,
        columns: Vec<NormalizedColumn>,
    ) -> ResourceDefinition {
        let definition = ResourceDefinition {
            name: resolved_name.to_string(),
            location: self.location.clone(),
            table_name: table.to_string(),
            mode,
            workspace_ref: self.workspace_ref.clone(),
            input_stream: ingress_stream(table),
            output_stream: egress_stream(table, mode),
            columns,
            endpoint_ref: self.endpoint_ref.clone(),
        };
        tracing::debug!(
            table,
            name = %definition.name,
            columns = definition.columns.len(),
            output_stream = %definition.output_stream,
            "Synthesized data collection rule"
        );
        definition
    }
}
