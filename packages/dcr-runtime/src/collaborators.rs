//! Remote collaborators the controller drives.
//!
//! Every method is a blocking remote call and is only ever invoked through
//! [`with_auth_retry`](crate::retry::with_auth_retry).

use serde_json::Value;

use dcr_core::error::Result;
use dcr_core::template::ResourceDefinition;

use crate::session::Session;

/// Reads table schemas from the remote system.
pub trait SchemaSource: Send + Sync {
    /// Fetches the schema document of `table` from `workspace`; `None` when
    /// the table does not exist there under that exact name.
    fn fetch_schema(
        &self,
        session: &Session,
        workspace: &str,
        table: &str,
    ) -> Result<Option<Value>>;
}

/// Checks for and creates DCR resources.
pub trait Deployer: Send + Sync {
    /// Whether a resource named `name` already exists.
    fn resource_exists(&self, session: &Session, name: &str) -> Result<bool>;

    /// Creates the resource.
    fn deploy(&self, session: &Session, definition: &ResourceDefinition) -> Result<()>;
}

/// Issues authenticated sessions.
pub trait SessionProvider: Send + Sync {
    /// Acquires a fresh session.
    fn acquire(&self) -> Result<Session>;

    /// Replaces `stale` with a new session.
    fn refresh(&self, stale: &Session) -> Result<Session>;
}
