//! Reconciliation runtime for DCR synthesis.
//!
//! Drives tables through the core pipeline against remote collaborators,
//! with bounded auth retries, idempotent session refresh and optional
//! parallel workers.

pub mod collaborators;
pub mod controller;
pub mod local;
pub mod retry;
pub mod session;
pub mod summary;

pub use collaborators::{Deployer, SchemaSource, SessionProvider};
pub use controller::{CancellationFlag, Controller};
pub use local::{DirectoryDeployer, DirectorySchemaSource, StaticSessionProvider};
pub use retry::with_auth_retry;
pub use session::{Session, SessionHandle};
pub use summary::{ControllerState, OutcomeCounts, RunSummary, TableOutcome, TableReport};
