//! Tests for StateManager

use super::*;
use crate::error::Error;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn sample_state() -> RunState {
    let mut state = RunState::new();
    state.last_run = Some("2024-05-01 12:00:00".to_string());
    state.set_columns("Order", vec!["Id".to_string(), "Total".to_string()]);
    state.set_columns(
        "Order_Items",
        vec!["LineNo".to_string(), "Order_Id".to_string()],
    );
    state
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_state_manager_new() {
    let manager = StateManager::new("/tmp/test-state.json");
    assert!(!manager.is_in_memory());
    assert_eq!(manager.path().to_str().unwrap(), "/tmp/test-state.json");
}

#[test]
fn test_state_manager_in_memory() {
    let manager = StateManager::in_memory();
    assert!(manager.is_in_memory());
}

#[test]
fn test_from_file_missing_is_empty() {
    let dir = tempdir().unwrap();
    let manager = StateManager::from_file(dir.path().join("state.json")).unwrap();
    assert!(!manager.is_in_memory());
}

#[test]
fn test_from_file_invalid_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "not json").unwrap();

    let err = StateManager::from_file(&path).unwrap_err();
    assert!(matches!(err, Error::State { .. }));
}

#[tokio::test]
async fn test_from_json() {
    let manager =
        StateManager::from_json(r#"{"previous_columns":{"Order":["Id"]}}"#).unwrap();
    assert!(manager.is_in_memory());
    assert_eq!(manager.snapshot().await.previous_columns("Order"), vec!["Id"]);
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_commit_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::new(&path);
    manager.commit(sample_state()).await.unwrap();
    assert!(path.exists());
    assert!(!dir.path().join("state.tmp").exists());

    let reloaded = StateManager::from_file(&path).unwrap();
    assert_eq!(reloaded.snapshot().await, sample_state());
}

#[tokio::test]
async fn test_save_creates_parent_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");

    let manager = StateManager::new(&path);
    manager.commit(sample_state()).await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_load_replaces_cached_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::new(&path);
    assert_eq!(manager.snapshot().await, RunState::new());

    std::fs::write(&path, serde_json::to_string(&sample_state()).unwrap()).unwrap();
    manager.load().await.unwrap();
    assert_eq!(manager.snapshot().await, sample_state());
}

#[tokio::test]
async fn test_load_missing_file_keeps_state() {
    let dir = tempdir().unwrap();
    let manager = StateManager::new(dir.path().join("absent.json"));
    manager.load().await.unwrap();
    assert_eq!(manager.snapshot().await, RunState::new());
}

#[tokio::test]
async fn test_in_memory_save_is_noop() {
    let manager = StateManager::in_memory();
    manager.commit(sample_state()).await.unwrap();
    assert_eq!(manager.snapshot().await, sample_state());
}

#[tokio::test]
async fn test_saved_json_uses_documented_keys() {
    let manager = StateManager::with_state(sample_state());
    let json = manager.to_json_pretty().await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["last_run"], "2024-05-01 12:00:00");
    assert_eq!(value["previous_columns"]["Order"][1], "Total");
}

#[tokio::test]
async fn test_clone_shares_state() {
    let manager = StateManager::in_memory();
    let clone = manager.clone();
    manager.commit(sample_state()).await.unwrap();

    assert_eq!(clone.state().await.previous_columns("Order").len(), 2);
}
