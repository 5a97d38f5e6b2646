//! Integration tests for the synthesis pipeline.
//!
//! 1. Schema document to template, for each shape and mode
//! 2. Naming under tight constraints
//! 3. Artifact store against real directories

pub mod artifact_tests;
pub mod helpers;
pub mod naming_tests;
pub mod pipeline_tests;
