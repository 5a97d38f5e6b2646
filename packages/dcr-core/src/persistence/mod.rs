//! Versioned template artifacts on disk.
//!
//! Layout under the output directory:
//!
//! ```text
//! <out>/<table>/<name>-<timestamp>.json   one file per write
//! <out>/<table>/latest.json               copy of the newest version
//! <out>/<table>/manifest.json             versions with CRC32 checksums
//! ```


mod io_utils;
mod manifest;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{DcrError, Result};
use crate::template::ResourceDefinition;

pub use io_utils::{classify_io_error, retry_io_operation, write_atomic};
pub use manifest::{checksum, Manifest, ManifestEntry, MANIFEST_FILE};

/// File name of the newest template copy.
pub const LATEST_FILE: &str = "latest.json";

/// Where a template was written and what it contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// Versioned file
    pub version_path: PathBuf,
    /// `latest.json` copy
    pub latest_path: PathBuf,
    /// Template size in bytes
    pub size_bytes: usize,
    /// CRC32 of the template
    pub checksum: u32,
}

/// Writes and reads synthesized templates.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// Root output directory
    output_dir: PathBuf,
    /// Maximum retry attempts for transient I/O errors
    max_retries: u32,
    /// Delay between retry attempts in milliseconds
    retry_delay_ms: u64,
}

impl ArtifactStore {
    /// Creates a store rooted at `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>, max_retries: u32, retry_delay_ms: u64) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_retries,
            retry_delay_ms,
        }
    }

    /// Root output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory holding the artifacts of `table`.
    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.output_dir.join(directory_name(table))
    }

    /// Writes a new version of the definition's template.
    pub fn write(&self, definition: &ResourceDefinition) -> Result<ArtifactRecord> {
        let json = definition.to_json_pretty()?;
        retry_io_operation(
            || self.write_internal(definition, json.as_bytes()),
            self.max_retries,
            self.retry_delay_ms,
            "write_artifact",
        )
    }

    fn write_internal(&self, definition: &ResourceDefinition, bytes: &[u8]) -> Result<ArtifactRecord> {
        let table_dir = self.table_dir(&definition.table_name);
        fs::create_dir_all(&table_dir)
            .map_err(|e| classify_io_error(e, "Failed to create artifact directory"))?;

        let now = Utc::now();
        let stamp = now.format("%Y%m%dT%H%M%S%.3fZ").to_string();
        let version_path = unique_version_path(&table_dir, &definition.name, &stamp);
        let latest_path = table_dir.join(LATEST_FILE);
        let sum = checksum(bytes);

        io_utils::write_atomic(&version_path, bytes)?;
        io_utils::write_atomic(&latest_path, bytes)?;

        let mut manifest = Manifest::load(&table_dir, &definition.table_name)?;
        manifest.versions.push(ManifestEntry {
            file: file_name(&version_path),
            name: definition.name.clone(),
            checksum: sum,
            size_bytes: bytes.len(),
            written_at: now.to_rfc3339(),
        });
        manifest.save(&table_dir)?;

        tracing::info!(
            table = %definition.table_name,
            path = %version_path.display(),
            bytes = bytes.len(),
            checksum = %format!("{:08x}", sum),
            "Wrote template artifact"
        );

        Ok(ArtifactRecord {
            version_path,
            latest_path,
            size_bytes: bytes.len(),
            checksum: sum,
        })
    }

    /// Reads the newest template of `table`, verifying its checksum.
    ///
    /// Returns `None` when nothing was written for the table yet.
    pub fn load_latest(&self, table: &str) -> Result<Option<ResourceDefinition>> {
        let table_dir = self.table_dir(table);
        let latest_path = table_dir.join(LATEST_FILE);
        if !latest_path.exists() {
            return Ok(None);
        }

        let bytes =
            fs::read(&latest_path).map_err(|e| classify_io_error(e, "Failed to read artifact"))?;
        let manifest = Manifest::load(&table_dir, table)?;
        if let Some(expected) = manifest.latest() {
            let actual = checksum(&bytes);
            if actual != expected.checksum {
                return Err(DcrError::DataCorruption(format!(
                    "Checksum mismatch for '{}': expected {:08x}, got {:08x}",
                    latest_path.display(),
                    expected.checksum,
                    actual
                )));
            }
        }

        let template: serde_json::Value = serde_json::from_slice(&bytes)?;
        ResourceDefinition::from_template(&template).map(Some)
    }

    /// Versions recorded for `table`, oldest first.
    pub fn versions(&self, table: &str) -> Result<Vec<ManifestEntry>> {
        Ok(Manifest::load(&self.table_dir(table), table)?.versions)
    }
}

/// First free `<name>-<stamp>[-N].json` in `dir`.
fn unique_version_path(dir: &Path, name: &str, stamp: &str) -> PathBuf {
    let base = format!("{}-{}", name, stamp);
    let mut path = dir.join(format!("{}.json", base));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}-{}.json", base, n));
        n += 1;
    }
    path
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Table identifiers used as directory names lose path separators.
fn directory_name(table: &str) -> String {
    table
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == ':' { '_' } else { c })
        .collect()
}
