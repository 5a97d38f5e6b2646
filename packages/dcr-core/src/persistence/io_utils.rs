//! I/O helpers for artifact writes.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::{DcrError, Result};

/// Classifies I/O errors into specific DcrError variants.
pub fn classify_io_error(error: std::io::Error, context: &str) -> DcrError {
    match error.kind() {
        ErrorKind::StorageFull | ErrorKind::OutOfMemory => {
            DcrError::DiskFull(format!("{}: {}", context, error))
        }
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
            DcrError::TransientIoError(format!("{}: {}", context, error))
        }
        _ => DcrError::IoError(format!("{}: {}", context, error)),
    }
}

/// Retries an operation that may fail with transient I/O errors.
pub fn retry_io_operation<F, T>(
    operation: F,
    max_retries: u32,
    retry_delay_ms: u64,
    context: &str,
) -> Result<T>
where
    F: Fn() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(err) if err.is_transient_io() && attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    context,
                    attempt,
                    max_retries,
                    error = %err,
                    "Transient I/O error, retrying"
                );
                if retry_delay_ms > 0 {
                    std::thread::sleep(std::time::Duration::from_millis(retry_delay_ms));
                }
            }
            Err(err) => return Err(err),
        }
    }
}

/// Writes `bytes` to `path` through a synced temp file and a rename, so
/// readers never observe a partial file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut temp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| DcrError::IoError(format!("Not a file path: {}", path.display())))?;
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let mut file =
        File::create(&temp_path).map_err(|e| classify_io_error(e, "Failed to create temp file"))?;
    file.write_all(bytes)
        .map_err(|e| classify_io_error(e, "Failed to write artifact"))?;
    file.sync_all()
        .map_err(|e| classify_io_error(e, "Failed to sync artifact"))?;

    fs::rename(&temp_path, path).map_err(|e| classify_io_error(e, "Failed to rename artifact"))?;
    Ok(())
}
