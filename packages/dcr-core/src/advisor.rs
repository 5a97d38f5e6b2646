//! Auto-deploy vs. manual-deploy classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::template::ResourceDefinition;
use crate::warning::TableWarning;

/// Platform hard limit for a DCR payload.
pub const MAX_TEMPLATE_BYTES: usize = 4_000_000;

/// Above this size a non-blocking warning is emitted.
pub const WARN_TEMPLATE_BYTES: usize = 2_000_000;

/// Above this column count deployments tend to time out.
pub const MAX_AUTO_COLUMNS: usize = 300;

/// Rough deployment complexity by column count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComplexityTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ComplexityTier {
    /// Tier for a column count: up to 50 Low, 100 Medium, 150 High.
    pub fn for_columns(count: usize) -> Self {
        match count {
            0..=50 => ComplexityTier::Low,
            51..=100 => ComplexityTier::Medium,
            101..=150 => ComplexityTier::High,
            _ => ComplexityTier::VeryHigh,
        }
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComplexityTier::Low => "Low",
            ComplexityTier::Medium => "Medium",
            ComplexityTier::High => "High",
            ComplexityTier::VeryHigh => "VeryHigh",
        };
        f.write_str(label)
    }
}

/// Whether a definition can be deployed automatically, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentVerdict {
    pub auto_deployable: bool,
    pub reason: String,
    pub complexity_tier: ComplexityTier,
    pub column_count: usize,
    pub warnings: Vec<TableWarning>,
}

/// Assesses a definition given its serialized size.
///
/// Rules in order: over the hard byte limit is manual-only at `VeryHigh`;
/// over the column limit is manual-only; over the warning size stays
/// automatic with a warning.
pub fn assess(definition: &ResourceDefinition, serialized_size_bytes: usize) -> DeploymentVerdict {
    let column_count = definition.columns.len();
    let tier = ComplexityTier::for_columns(column_count);

    let verdict = if serialized_size_bytes > MAX_TEMPLATE_BYTES {
        DeploymentVerdict {
            auto_deployable: false,
            reason: format!(
                "template is {} bytes, over the {} byte limit",
                serialized_size_bytes, MAX_TEMPLATE_BYTES
            ),
            complexity_tier: ComplexityTier::VeryHigh,
            column_count,
            warnings: vec![TableWarning::SizeExceeded {
                bytes: serialized_size_bytes,
                limit: MAX_TEMPLATE_BYTES,
            }],
        }
    } else if column_count > MAX_AUTO_COLUMNS {
        DeploymentVerdict {
            auto_deployable: false,
            reason: format!(
                "{} columns, over the {} column limit for automatic deployment",
                column_count, MAX_AUTO_COLUMNS
            ),
            complexity_tier: tier,
            column_count,
            warnings: vec![TableWarning::ColumnCountExceeded {
                count: column_count,
                limit: MAX_AUTO_COLUMNS,
            }],
        }
    } else if serialized_size_bytes > WARN_TEMPLATE_BYTES {
        DeploymentVerdict {
            auto_deployable: true,
            reason: format!(
                "template is large ({} bytes) but within limits",
                serialized_size_bytes
            ),
            complexity_tier: tier,
            column_count,
            warnings: vec![TableWarning::SizeWarning {
                bytes: serialized_size_bytes,
            }],
        }
    } else {
        DeploymentVerdict {
            auto_deployable: true,
            reason: "within size and column limits".to_string(),
            complexity_tier: tier,
            column_count,
            warnings: Vec::new(),
        }
    };

    tracing::debug!(
        name = %definition.name,
        bytes = serialized_size_bytes,
        columns = column_count,
        auto = verdict.auto_deployable,
        tier = %verdict.complexity_tier,
        "Assessed deployment"
    );
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NormalizedColumn, TableMode};
    use crate::template::TemplateSynthesizer;
    use crate::types::TargetType;

    fn definition(columns: usize) -> ResourceDefinition {
        let columns = (0..columns)
            .map(|i| NormalizedColumn {
                name: format!("Column{}", i),
                r#type: TargetType::String,
            })
            .collect();
        TemplateSynthesizer::new("westeurope", "/workspaces/law", None).synthesize(
            "Wide_CL",
            TableMode::Custom,
            "dcr-Wide",
            columns,
        )
    }

    #[test]
    fn test_over_hard_limit_is_manual_very_high() {
        let verdict = assess(&definition(10), 4_500_000);
        assert!(!verdict.auto_deployable);
        assert_eq!(verdict.complexity_tier, ComplexityTier::VeryHigh);
        assert!(matches!(
            verdict.warnings.as_slice(),
            [TableWarning::SizeExceeded { .. }]
        ));
    }

    #[test]
    fn test_column_rule_fires_under_size_thresholds() {
        let verdict = assess(&definition(320), 1_000_000);
        assert!(!verdict.auto_deployable);
        assert_eq!(verdict.column_count, 320);
        assert_eq!(verdict.complexity_tier, ComplexityTier::VeryHigh);
    }

    #[test]
    fn test_size_warning_stays_auto() {
        let verdict = assess(&definition(20), 2_500_000);
        assert!(verdict.auto_deployable);
        assert_eq!(verdict.complexity_tier, ComplexityTier::Low);
        assert_eq!(
            verdict.warnings,
            vec![TableWarning::SizeWarning { bytes: 2_500_000 }]
        );
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        assert!(assess(&definition(300), MAX_TEMPLATE_BYTES).auto_deployable);
        assert!(assess(&definition(1), WARN_TEMPLATE_BYTES).warnings.is_empty());
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(ComplexityTier::for_columns(50), ComplexityTier::Low);
        assert_eq!(ComplexityTier::for_columns(51), ComplexityTier::Medium);
        assert_eq!(ComplexityTier::for_columns(100), ComplexityTier::Medium);
        assert_eq!(ComplexityTier::for_columns(150), ComplexityTier::High);
        assert_eq!(ComplexityTier::for_columns(151), ComplexityTier::VeryHigh);
    }
}
