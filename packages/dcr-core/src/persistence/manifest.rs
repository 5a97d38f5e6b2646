//! Per-table version manifest.

use std::fs;
use std::path::Path;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::{DcrError, Result};

use super::io_utils::{classify_io_error, write_atomic};

/// File name of the manifest inside a table directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One written template version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Version file name, relative to the table directory
    pub file: String,
    /// DCR name the template declares
    pub name: String,
    /// CRC32 of the file contents
    pub checksum: u32,
    /// File size in bytes
    pub size_bytes: usize,
    /// RFC 3339 write time
    pub written_at: String,
}

/// Versions recorded for one table, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub table: String,
    #[serde(default)]
    pub versions: Vec<ManifestEntry>,
}

impl Manifest {
    /// Loads the manifest of `table_dir`; a missing file yields an empty one.
    pub fn load(table_dir: &Path, table: &str) -> Result<Self> {
        let path = table_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Manifest {
                table: table.to_string(),
                versions: Vec::new(),
            });
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| classify_io_error(e, "Failed to read manifest"))?;
        serde_json::from_str(&contents)
            .map_err(|e| DcrError::SerializationError(format!("Failed to parse manifest: {}", e)))
    }

    /// Writes the manifest into `table_dir`.
    pub fn save(&self, table_dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(&table_dir.join(MANIFEST_FILE), json.as_bytes())
    }

    /// Most recent version.
    pub fn latest(&self) -> Option<&ManifestEntry> {
        self.versions.last()
    }
}

/// CRC32 of a byte slice.
pub fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}
