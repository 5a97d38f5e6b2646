//! Core synthesis engine for Azure Monitor Data Collection Rules.
//!
//! Provides source type mapping, column filtering, schema shape
//! resolution, name resolution, template synthesis, deployment advice
//! and versioned artifact storage.

pub mod advisor;
pub mod config;
pub mod error;
pub mod naming;
pub mod persistence;
pub mod schema;
pub mod template;
pub mod types;
pub mod warning;

pub use advisor::{assess, ComplexityTier, DeploymentVerdict};
pub use config::EngineConfig;
pub use error::{DcrError, Result};
pub use naming::{NameConstraint, NameOverride, NameResolver, OverrideDecision, ResolvedName};
pub use persistence::{ArtifactRecord, ArtifactStore};
pub use schema::{NormalizedColumn, RawColumn, Resolution, SchemaResolver, TableMode};
pub use template::{ResourceDefinition, TemplateSynthesizer};
pub use types::TargetType;
pub use warning::TableWarning;
