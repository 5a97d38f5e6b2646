//! Engine configuration.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DcrError, Result};
use crate::naming::NameConstraint;
use crate::schema::TableMode;

/// Upper bound on auth retries per remote call.
pub const MAX_AUTH_RETRIES: u32 = 2;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "DCR_";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Native or custom table processing
    pub mode: TableMode,
    /// Azure region for synthesized rules
    pub location: String,
    /// Log Analytics workspace resource id
    pub workspace: String,
    /// Optional data collection endpoint resource id
    pub endpoint: Option<String>,
    /// Per-table workspace resource ids
    pub workspace_overrides: HashMap<String, String>,
    /// Artifact output directory
    pub output_dir: PathBuf,
    /// Resource naming rules
    pub name: NameConstraint,
    /// Auth retries per remote call (capped at 2)
    pub auth_max_retries: u32,
    /// Maximum retry attempts for transient I/O errors
    pub io_max_retries: u32,
    /// Delay between I/O retry attempts in milliseconds
    pub io_retry_delay_ms: u64,
    /// Deploy auto-deployable rules (false = dry run)
    pub deploy: bool,
    /// Process tables on a worker pool
    pub parallel: bool,
    /// Log filter directive
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: TableMode::Custom,
            location: "westeurope".to_string(),
            workspace: String::new(),
            endpoint: None,
            workspace_overrides: HashMap::new(),
            output_dir: PathBuf::from("./generated-templates"),
            name: NameConstraint::default(),
            auth_max_retries: MAX_AUTH_RETRIES,
            io_max_retries: 3,
            io_retry_delay_ms: 100,
            deploy: false,
            parallel: false,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| DcrError::InvalidConfig(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            DcrError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&source)
    }

    /// Applies `DCR_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies `DCR_*` overrides read through `lookup`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(location) = var("LOCATION") {
            self.location = location;
        }
        if let Some(workspace) = var("WORKSPACE") {
            self.workspace = workspace;
        }
        if let Some(endpoint) = var("ENDPOINT") {
            self.endpoint = Some(endpoint).filter(|e| !e.is_empty());
        }
        if let Some(dir) = var("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(mode) = var("MODE") {
            self.mode = mode.parse().map_err(DcrError::InvalidConfig)?;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    /// Workspace for a table, honoring per-table overrides.
    ///
    /// Overrides keyed by the identifier the operator gave win over those
    /// keyed by the resolved remote name.
    pub fn workspace_for(&self, requested: &str, resolved: &str) -> &str {
        let overrides = &self.workspace_overrides;
        overrides
            .get(requested)
            .or_else(|| overrides.get(resolved))
            .map(String::as_str)
            .unwrap_or(&self.workspace)
    }

    /// Checks the configuration for values no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.location.trim().is_empty() {
            return Err(DcrError::InvalidConfig("location must not be empty".into()));
        }
        if self.workspace.trim().is_empty() {
            return Err(DcrError::InvalidConfig("workspace must not be empty".into()));
        }
        if self.name.min_length < 1 {
            return Err(DcrError::InvalidConfig(
                "name.min_length must be at least 1".into(),
            ));
        }
        if self.name.min_length > self.name.max_length {
            return Err(DcrError::InvalidConfig(format!(
                "name.min_length ({}) exceeds name.max_length ({})",
                self.name.min_length, self.name.max_length
            )));
        }
        if self.auth_max_retries > MAX_AUTH_RETRIES {
            return Err(DcrError::InvalidConfig(format!(
                "auth_max_retries ({}) exceeds the maximum of {}",
                self.auth_max_retries, MAX_AUTH_RETRIES
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.auth_max_retries, 2);
        assert_eq!(config.name.max_length, 64);
        assert_eq!(config.name.min_length, 3);
        assert!(!config.deploy);
        // Workspace has no sensible default.
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EngineConfig::from_toml(
            r#"
            mode = "native"
            location = "northeurope"
            workspace = "/subscriptions/s/workspaces/law"

            [name]
            prefix = "dcr-cribl-"
            max_length = 30

            [workspace_overrides]
            Syslog = "/subscriptions/s/workspaces/syslog"
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, TableMode::Native);
        assert_eq!(config.name.prefix, "dcr-cribl-");
        assert_eq!(config.name.min_length, 3);
        assert_eq!(
            config.workspace_for("Syslog", "Syslog"),
            "/subscriptions/s/workspaces/syslog"
        );
        assert_eq!(
            config.workspace_for("Heartbeat", "Heartbeat"),
            "/subscriptions/s/workspaces/law"
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_toml_is_invalid_config() {
        let err = EngineConfig::from_toml("mode = \"both\"").unwrap_err();
        assert!(matches!(err, DcrError::InvalidConfig(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::default();
        let env: HashMap<&str, &str> = [
            ("DCR_LOCATION", "eastus"),
            ("DCR_WORKSPACE", "/workspaces/env"),
            ("DCR_MODE", "native"),
            ("DCR_ENDPOINT", ""),
        ]
        .into_iter()
        .collect();
        config
            .apply_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.location, "eastus");
        assert_eq!(config.workspace, "/workspaces/env");
        assert_eq!(config.mode, TableMode::Native);
        assert_eq!(config.endpoint, None);
    }

    #[test]
    fn test_workspace_override_by_requested_or_resolved_name() {
        let mut config = EngineConfig {
            workspace: "/workspaces/law".into(),
            ..EngineConfig::default()
        };
        config
            .workspace_overrides
            .insert("Contoso_CL".into(), "/workspaces/contoso".into());
        config
            .workspace_overrides
            .insert("Fabrikam".into(), "/workspaces/fabrikam".into());

        assert_eq!(config.workspace_for("Contoso", "Contoso_CL"), "/workspaces/contoso");
        assert_eq!(config.workspace_for("Fabrikam", "Fabrikam_CL"), "/workspaces/fabrikam");
        assert_eq!(config.workspace_for("Other", "Other_CL"), "/workspaces/law");
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = EngineConfig {
            workspace: "/workspaces/law".into(),
            ..EngineConfig::default()
        };
        config.auth_max_retries = 3;
        assert!(config.validate().is_err());

        config.auth_max_retries = 1;
        config.name.min_length = 80;
        assert!(config.validate().is_err());

        config.name.min_length = 0;
        assert!(config.validate().is_err());
    }
}
