//! Persistence Atomicity Tests
//!
//! A persist is split into `stage` (temp file written and synced) and
//! `commit` (rename over the target). Stopping after either half must
//! leave the target byte-identical to either the old or the new content.

use std::fs;
use std::time::Duration;

use docstore::storage::{self, encode_records};
use docstore::{CollectionOptions, CollectionStore, Record};
use serde_json::{json, Value};
use tempfile::TempDir;

fn rec(value: Value) -> Record {
    docstore::record::from_value(value).expect("object literal")
}

fn notes(path: &std::path::Path) -> CollectionStore {
    CollectionStore::new("notes", path, CollectionOptions::new(), true)
}

/// Collection file holding one record, and its bytes
async fn seeded(temp_dir: &TempDir) -> (std::path::PathBuf, Vec<u8>) {
    let path = temp_dir.path().join("notes.json");
    notes(&path).create(rec(json!({"id": "n1", "title": "old"}))).await.unwrap();
    let bytes = fs::read(&path).unwrap();
    (path, bytes)
}

fn next_content(old: &[u8]) -> Vec<u8> {
    let mut records = storage::decode_records(std::path::Path::new("notes.json"), old).unwrap();
    records.push(rec(json!({"id": "n2", "title": "new"})));
    encode_records(&records, true).unwrap()
}

fn leftover_temps(temp_dir: &TempDir) -> usize {
    fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .count()
}

// =============================================================================
// Crash before rename
// =============================================================================

#[tokio::test]
async fn test_staged_but_not_renamed_keeps_old_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let (path, old) = seeded(&temp_dir).await;
    let new = next_content(&old);

    // Process dies here: staged file never renamed, no destructor runs
    let staged = storage::stage(&path, &new).await.unwrap();
    assert_eq!(fs::read(&path).unwrap(), old);
    assert_eq!(fs::read(staged.temp_path()).unwrap(), new);
    std::mem::forget(staged);

    let reopened = notes(&path);
    let records = reopened.all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["title"], "old");
}

#[tokio::test]
async fn test_dropped_stage_removes_temp() {
    let temp_dir = TempDir::new().unwrap();
    let (path, old) = seeded(&temp_dir).await;

    let staged = storage::stage(&path, &next_content(&old)).await.unwrap();
    drop(staged);

    assert_eq!(fs::read(&path).unwrap(), old);
    assert_eq!(leftover_temps(&temp_dir), 0);
}

#[tokio::test]
async fn test_discard_removes_temp() {
    let temp_dir = TempDir::new().unwrap();
    let (path, old) = seeded(&temp_dir).await;

    let staged = storage::stage(&path, &next_content(&old)).await.unwrap();
    staged.discard().await.unwrap();

    assert_eq!(fs::read(&path).unwrap(), old);
    assert_eq!(leftover_temps(&temp_dir), 0);
}

// =============================================================================
// Crash after rename
// =============================================================================

#[tokio::test]
async fn test_committed_write_is_complete() {
    let temp_dir = TempDir::new().unwrap();
    let (path, old) = seeded(&temp_dir).await;
    let new = next_content(&old);

    let staged = storage::stage(&path, &new).await.unwrap();
    staged.commit().await.unwrap();

    assert_eq!(fs::read(&path).unwrap(), new);
    assert_eq!(leftover_temps(&temp_dir), 0);

    let reopened = notes(&path);
    assert_eq!(reopened.all().await.unwrap().len(), 2);
}

// =============================================================================
// Store-level behavior
// =============================================================================

#[tokio::test]
async fn test_every_mutation_leaves_no_temp_files() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notes.json");
    let store = notes(&path);

    store.create(rec(json!({"id": "a", "title": "1"}))).await.unwrap();
    store.update("a", rec(json!({"title": "2"}))).await.unwrap();
    store
        .replace_all(vec![rec(json!({"id": "b"})), rec(json!({"id": "c"}))])
        .await
        .unwrap();
    store.remove("b").await.unwrap();

    assert_eq!(leftover_temps(&temp_dir), 0);
    let on_disk = storage::load_records(&path).await.unwrap();
    assert_eq!(on_disk, store.all().await.unwrap());
}

#[tokio::test]
async fn test_failed_write_keeps_memory_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notes.json");
    let store = notes(&path);
    store.create(rec(json!({"id": "a"}))).await.unwrap();

    // A directory squatting on the target makes the rename fail
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();
    fs::write(path.join("blocker"), b"x").unwrap();

    let err = store.create(rec(json!({"id": "b"}))).await.unwrap_err();
    assert_eq!(err.code(), "STORE_IO_ERROR");
    assert!(store.read("b").await.unwrap().is_none());
    assert_eq!(store.all().await.unwrap().len(), 1);
    assert_eq!(leftover_temps(&temp_dir), 0);
}

#[tokio::test]
async fn test_identical_state_encodes_identically() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notes.json");
    let store = notes(&path);
    store.create(rec(json!({"id": "a", "b": 1, "a": 2}))).await.unwrap();
    let first = fs::read(&path).unwrap();

    store.reload().await.unwrap();
    let records = store.all().await.unwrap();
    assert_eq!(encode_records(&records, true).unwrap(), first);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandoned_mutation_keeps_disk_and_memory_equal() {
    for micros in [0u64, 10, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000] {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.json");
        let store = notes(&path);
        store.create(rec(json!({"id": "seed"}))).await.unwrap();

        // Caller gives up partway through the write
        let _ = tokio::time::timeout(
            Duration::from_micros(micros),
            store.create(rec(json!({"id": "x"}))),
        )
        .await;

        // Waits for any detached write, then persists on top of it
        store.create(rec(json!({"id": "y"}))).await.unwrap();

        let on_disk = storage::load_records(&path).await.unwrap();
        let in_memory = store.all().await.unwrap();
        assert_eq!(on_disk, in_memory, "diverged after {}us", micros);
        assert!(in_memory.iter().any(|r| r["id"] == "y"));
        assert_eq!(leftover_temps(&temp_dir), 0, "temp left after {}us", micros);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandoned_update_and_remove_stay_consistent() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notes.json");
    let store = notes(&path);
    store
        .replace_all(vec![rec(json!({"id": "a"})), rec(json!({"id": "b"}))])
        .await
        .unwrap();

    for micros in [0u64, 100, 1_000] {
        let _ = tokio::time::timeout(
            Duration::from_micros(micros),
            store.update("a", rec(json!({"n": micros}))),
        )
        .await;
        let _ = tokio::time::timeout(Duration::from_micros(micros), store.remove("b")).await;
        store.create(rec(json!({"id": format!("c{}", micros)}))).await.unwrap();

        assert_eq!(storage::load_records(&path).await.unwrap(), store.all().await.unwrap());
    }
    assert_eq!(leftover_temps(&temp_dir), 0);
}
