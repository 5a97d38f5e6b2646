//! Artifact store against real directories.

use std::fs;
use std::sync::Arc;
use std::thread;

use ntest::timeout;
use tempfile::tempdir;

use dcr_core::persistence::{ArtifactStore, LATEST_FILE, MANIFEST_FILE};
use dcr_core::schema::TableMode;

use super::helpers::{flat_document, run_pipeline};

#[test]
#[timeout(5000)]
fn test_pipeline_output_persists_and_reloads() {
    let temp_dir = tempdir().unwrap();
    let store = ArtifactStore::new(temp_dir.path(), 3, 0);
    let document = flat_document(&[("TimeGenerated", "datetime"), ("SessionId", "guid")]);
    let output = run_pipeline("Contoso_CL", TableMode::Custom, &[("Contoso_CL", document)]).unwrap();

    let record = store.write(&output.definition).unwrap();
    let table_dir = temp_dir.path().join("Contoso_CL");
    assert!(table_dir.join(LATEST_FILE).exists());
    assert!(table_dir.join(MANIFEST_FILE).exists());
    assert!(record.version_path.starts_with(&table_dir));

    // The persisted template deploys without the schema fetch.
    let reloaded = store.load_latest("Contoso_CL").unwrap().unwrap();
    assert_eq!(reloaded, output.definition);
}

#[test]
#[timeout(10000)]
fn test_concurrent_writes_to_distinct_tables() {
    let temp_dir = tempdir().unwrap();
    let store = Arc::new(ArtifactStore::new(temp_dir.path(), 3, 0));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let table = format!("Table{}_CL", i);
                let document = flat_document(&[("TimeGenerated", "datetime")]);
                let output =
                    run_pipeline(&table, TableMode::Custom, &[(table.as_str(), document)]).unwrap();
                store.write(&output.definition).unwrap();
                table
            })
        })
        .collect();

    for handle in handles {
        let table = handle.join().unwrap();
        assert_eq!(store.versions(&table).unwrap().len(), 1);
        assert!(store.load_latest(&table).unwrap().is_some());
    }
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 8);
}
