//! File-backed collaborators for offline runs and tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use dcr_core::error::{DcrError, Result};
use dcr_core::persistence::{classify_io_error, write_atomic};
use dcr_core::template::ResourceDefinition;

use crate::collaborators::{Deployer, SchemaSource, SessionProvider};
use crate::session::Session;

/// Environment variable holding the token for [`StaticSessionProvider`].
pub const ACCESS_TOKEN_ENV: &str = "DCR_ACCESS_TOKEN";

/// Reads `<dir>/<table>.json` schema documents.
///
/// A document under `<dir>/<workspace>/`, where `<workspace>` is the last
/// segment of the workspace resource id, shadows the shared one.
#[derive(Debug, Clone)]
pub struct DirectorySchemaSource {
    dir: PathBuf,
}

impl DirectorySchemaSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn document_path(&self, workspace: &str, table: &str) -> Option<PathBuf> {
        let scoped = workspace
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .filter(|segment| json_path(&self.dir, segment).is_some())
            .and_then(|segment| json_path(&self.dir.join(segment), table))
            .filter(|path| path.exists());
        scoped.or_else(|| json_path(&self.dir, table))
    }
}

impl SchemaSource for DirectorySchemaSource {
    fn fetch_schema(
        &self,
        _session: &Session,
        workspace: &str,
        table: &str,
    ) -> Result<Option<Value>> {
        let Some(path) = self.document_path(workspace, table) else {
            return Ok(None);
        };
        if !path.exists() {
            tracing::debug!(table, workspace, path = %path.display(), "No schema document");
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| classify_io_error(e, "Failed to read schema document"))?;
        let document = serde_json::from_str(&contents).map_err(|e| {
            DcrError::SerializationError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Some(document))
    }
}

/// Treats `<dir>/<name>.json` as a deployed resource.
#[derive(Debug, Clone)]
pub struct DirectoryDeployer {
    dir: PathBuf,
}

impl DirectoryDeployer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn resource_path(&self, name: &str) -> Result<PathBuf> {
        json_path(&self.dir, name)
            .ok_or_else(|| DcrError::IoError(format!("Invalid resource name '{}'", name)))
    }
}

impl Deployer for DirectoryDeployer {
    fn resource_exists(&self, _session: &Session, name: &str) -> Result<bool> {
        Ok(self.resource_path(name)?.exists())
    }

    fn deploy(&self, _session: &Session, definition: &ResourceDefinition) -> Result<()> {
        let path = self.resource_path(&definition.name)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| classify_io_error(e, "Failed to create deploy directory"))?;
        write_atomic(&path, definition.to_json_pretty()?.as_bytes())?;
        tracing::info!(name = %definition.name, path = %path.display(), "Deployed resource");
        Ok(())
    }
}

/// Issues sessions from a fixed token; refresh bumps the generation.
#[derive(Debug)]
pub struct StaticSessionProvider {
    token: String,
    generation: AtomicU64,
}

impl StaticSessionProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            generation: AtomicU64::new(0),
        }
    }

    /// Token from `DCR_ACCESS_TOKEN`, or `"local"`.
    pub fn from_env() -> Self {
        Self::new(std::env::var(ACCESS_TOKEN_ENV).unwrap_or_else(|_| "local".to_string()))
    }
}

impl SessionProvider for StaticSessionProvider {
    fn acquire(&self) -> Result<Session> {
        Ok(Session::new(
            self.token.clone(),
            self.generation.load(Ordering::SeqCst),
        ))
    }

    fn refresh(&self, stale: &Session) -> Result<Session> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(stale = stale.generation, generation, "Issued new session");
        Ok(Session::new(self.token.clone(), generation))
    }
}

/// `<dir>/<name>.json`, or `None` when `name` would escape `dir`.
fn json_path(dir: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.contains(&['/', '\\'][..]) || name.starts_with('.') {
        return None;
    }
    Some(dir.join(format!("{}.json", name)))
}
