//! Error types for DCR synthesis.

use thiserror::Error;

/// Errors raised while resolving, synthesizing, persisting or deploying a
/// Data Collection Rule.
///
/// Conditions that only steer a table to the manual-deployment path (size,
/// column count, legacy schema) are not errors; they travel as
/// [`TableWarning`](crate::warning::TableWarning) values instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DcrError {
    /// No name variant of the table exists remotely
    #[error("Table '{table}' not found (probed: {probed})")]
    SchemaNotFound { table: String, probed: String },

    /// Shape detection produced a suspicious result. Raised only by
    /// [`Resolution::into_strict`](crate::schema::Resolution::into_strict);
    /// batch runs carry ambiguity as a warning.
    #[error("Schema for table '{table}' is ambiguous: {reason}")]
    SchemaAmbiguous { table: String, reason: String },

    /// No platform-legal name could be produced
    #[error("Cannot resolve a name for '{raw}': {reason}")]
    NameUnresolvable { raw: String, reason: String },

    /// Authentication expired (retryable through the auth-retry wrapper)
    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    /// Remote service failure that is not authentication related
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Artifact content does not match its recorded checksum
    #[error("Data corruption detected: {0}")]
    DataCorruption(String),

    /// Disk full error during artifact writes
    #[error("Disk full: {0}")]
    DiskFull(String),

    /// I/O error during artifact writes
    #[error("I/O error: {0}")]
    IoError(String),

    /// Transient I/O error that may succeed on retry
    #[error("Transient I/O error: {0}")]
    TransientIoError(String),

    /// Processing stopped before the table was started
    #[error("Cancelled")]
    Cancelled,
}

impl DcrError {
    /// Returns true for errors the auth-retry wrapper may retry.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, DcrError::AuthExpired(_))
    }

    /// Returns true for I/O errors worth another attempt.
    pub fn is_transient_io(&self) -> bool {
        matches!(self, DcrError::TransientIoError(_))
    }
}

impl From<serde_json::Error> for DcrError {
    fn from(err: serde_json::Error) -> Self {
        DcrError::SerializationError(err.to_string())
    }
}

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, DcrError>;
