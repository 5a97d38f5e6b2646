//! Per-table outcomes and the run summary.

use std::fmt;

use serde::Serialize;

use dcr_core::advisor::DeploymentVerdict;
use dcr_core::persistence::ArtifactRecord;
use dcr_core::warning::TableWarning;

/// States a table moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerState {
    Fetching,
    Resolving,
    Filtering,
    Naming,
    Synthesizing,
    Assessing,
    AutoDeploy,
    ManualHandoff,
    Skipped,
    Failed,
}

impl ControllerState {
    /// Whether processing has ended in this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ControllerState::AutoDeploy
                | ControllerState::ManualHandoff
                | ControllerState::Skipped
                | ControllerState::Failed
        )
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Operator-facing result for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TableOutcome {
    Created,
    AlreadyExists,
    ManualDeploymentRecommended(String),
    Skipped(String),
    Failed(String),
}

impl TableOutcome {
    /// Short label used in summaries.
    pub fn label(&self) -> &'static str {
        match self {
            TableOutcome::Created => "created",
            TableOutcome::AlreadyExists => "already exists",
            TableOutcome::ManualDeploymentRecommended(_) => "manual deployment recommended",
            TableOutcome::Skipped(_) => "skipped",
            TableOutcome::Failed(_) => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TableOutcome::Failed(_))
    }
}

impl fmt::Display for TableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableOutcome::ManualDeploymentRecommended(reason)
            | TableOutcome::Skipped(reason)
            | TableOutcome::Failed(reason) => write!(f, "{}: {}", self.label(), reason),
            _ => f.write_str(self.label()),
        }
    }
}

/// Everything recorded about one table.
#[derive(Debug, Clone)]
pub struct TableReport {
    /// Identifier as given in the batch
    pub table: String,
    pub outcome: TableOutcome,
    /// Terminal state reached
    pub final_state: ControllerState,
    /// State in which a failure occurred
    pub failed_at: Option<ControllerState>,
    /// Non-fatal conditions met on the way
    pub warnings: Vec<TableWarning>,
    /// Resolved DCR name, once naming succeeded
    pub definition_name: Option<String>,
    /// Written template, if any
    pub artifact: Option<ArtifactRecord>,
    /// Deployment advice, if assessed
    pub verdict: Option<DeploymentVerdict>,
}

impl TableReport {
    /// A report for a table that ended before any work was done.
    pub fn skipped(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            outcome: TableOutcome::Skipped(reason.into()),
            final_state: ControllerState::Skipped,
            failed_at: None,
            warnings: Vec::new(),
            definition_name: None,
            artifact: None,
            verdict: None,
        }
    }
}

/// Counts per outcome kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub created: usize,
    pub already_exists: usize,
    pub manual: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Result of one batch run, in input order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<TableReport>,
}

impl RunSummary {
    pub fn new(reports: Vec<TableReport>) -> Self {
        Self { reports }
    }

    /// Counts per outcome kind.
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for report in &self.reports {
            match report.outcome {
                TableOutcome::Created => counts.created += 1,
                TableOutcome::AlreadyExists => counts.already_exists += 1,
                TableOutcome::ManualDeploymentRecommended(_) => counts.manual += 1,
                TableOutcome::Skipped(_) => counts.skipped += 1,
                TableOutcome::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }

    /// `(table, reason)` for every failed table.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.reports
            .iter()
            .filter_map(|r| match &r.outcome {
                TableOutcome::Failed(reason) => Some((r.table.as_str(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.reports.iter().any(|r| r.outcome.is_failure())
    }

    /// Report for `table`, if it was part of the run.
    pub fn report(&self, table: &str) -> Option<&TableReport> {
        self.reports.iter().find(|r| r.table == table)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.counts();
        writeln!(f, "Processed {} table(s)", self.reports.len())?;
        writeln!(f, "  created:                       {}", counts.created)?;
        writeln!(f, "  already exists:                {}", counts.already_exists)?;
        writeln!(f, "  manual deployment recommended: {}", counts.manual)?;
        writeln!(f, "  skipped:                       {}", counts.skipped)?;
        writeln!(f, "  failed:                        {}", counts.failed)?;

        for report in &self.reports {
            write!(f, "{}: {}", report.table, report.outcome)?;
            if let Some(name) = &report.definition_name {
                write!(f, " [{}]", name)?;
            }
            writeln!(f)?;
            for warning in &report.warnings {
                writeln!(f, "    warning: {}", warning)?;
            }
        }

        let failures = self.failures();
        if !failures.is_empty() {
            writeln!(f, "Failures:")?;
            for (table, reason) in failures {
                writeln!(f, "  {}: {}", table, reason)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(table: &str, outcome: TableOutcome) -> TableReport {
        let failed = outcome.is_failure();
        TableReport {
            outcome,
            final_state: if failed {
                ControllerState::Failed
            } else {
                ControllerState::Skipped
            },
            ..TableReport::skipped(table, "")
        }
    }

    #[test]
    fn test_counts_and_failures() {
        let summary = RunSummary::new(vec![
            report("A", TableOutcome::Created),
            report("B", TableOutcome::AlreadyExists),
            report("C", TableOutcome::Failed("Table 'C' not found".into())),
            report("D", TableOutcome::ManualDeploymentRecommended("too wide".into())),
        ]);
        let counts = summary.counts();
        assert_eq!(counts.created, 1);
        assert_eq!(counts.already_exists, 1);
        assert_eq!(counts.manual, 1);
        assert_eq!(counts.failed, 1);
        assert!(summary.has_failures());
        assert_eq!(summary.failures(), vec![("C", "Table 'C' not found")]);

        let text = summary.to_string();
        assert!(text.contains("Processed 4 table(s)"));
        assert!(text.contains("C: failed: Table 'C' not found"));
    }

    #[test]
    fn test_terminal_states() {
        assert!(ControllerState::Skipped.is_terminal());
        assert!(!ControllerState::Naming.is_terminal());
    }
}
