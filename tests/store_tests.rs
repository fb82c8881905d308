/// Snapshot persistence tests for the property and call caches
use rust_estate_api::call_store::CallLogStore;
use rust_estate_api::local_storage::{LocalStorage, CALLS_KEY, PROPERTIES_KEY};
use rust_estate_api::models::PropertyInput;
use rust_estate_api::property_store::{LocalMutation, PropertyStore};
use rust_estate_api::services::VapiService;
use rust_estate_api::webhook_client::PropertyWebhookClient;
use serde_json::json;
use std::path::PathBuf;
use uuid::Uuid;

async fn temp_storage() -> (LocalStorage, PathBuf) {
    let dir = std::env::temp_dir().join(format!("estate_store_{}", Uuid::new_v4()));
    (LocalStorage::open(&dir).await.unwrap(), dir)
}

fn offline_property_store(storage: LocalStorage) -> PropertyStore {
    let client = PropertyWebhookClient::new("http://127.0.0.1:9/webhook".to_string()).unwrap();
    PropertyStore::new(storage, client)
}

fn offline_call_store(storage: LocalStorage) -> CallLogStore {
    let vapi = VapiService::with_base_url("http://127.0.0.1:9".to_string(), 50).unwrap();
    CallLogStore::new(storage, vapi)
}

fn input(value: serde_json::Value) -> PropertyInput {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_writes_survive_restart() {
    let (storage, dir) = temp_storage().await;

    let store = offline_property_store(storage.clone());
    store
        .commit_local(LocalMutation::Create(input(json!({"id": "a", "title": "Alpha"}))))
        .await
        .unwrap();
    store
        .commit_local(LocalMutation::Create(input(json!({"id": "b", "title": "Beta"}))))
        .await
        .unwrap();
    store
        .commit_local(LocalMutation::Delete("a".to_string()))
        .await
        .unwrap();
    let before = store.get("b").await.unwrap();
    store.dispose().await.unwrap();
    assert!(store.get_cached().await.is_empty());

    let restarted = offline_property_store(storage);
    assert_eq!(restarted.init().await, 2);

    let visible = restarted.get_cached().await;
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0], before);
    assert!(restarted.get("a").await.is_none());

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn test_corrupt_snapshots_start_empty() {
    let (storage, dir) = temp_storage().await;

    tokio::fs::write(storage.path_for(PROPERTIES_KEY), b"{\"data\": \"[{\\\"id\\\"")
        .await
        .unwrap();
    tokio::fs::write(storage.path_for(CALLS_KEY), b"\x00\x01garbage")
        .await
        .unwrap();

    let properties = offline_property_store(storage.clone());
    assert_eq!(properties.init().await, 0);
    assert!(properties.get_cached().await.is_empty());

    let calls = offline_call_store(storage);
    assert_eq!(calls.init().await, 0);
    assert!(calls.get_cached().await.is_empty());

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn test_tampered_snapshot_is_ignored() {
    let (storage, dir) = temp_storage().await;

    let store = offline_property_store(storage.clone());
    store
        .commit_local(LocalMutation::Create(input(json!({"id": "a", "price": 100}))))
        .await
        .unwrap();

    // Edit the payload without updating the checksum
    let path = storage.path_for(PROPERTIES_KEY);
    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    let mut entry: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let data = entry["data"].as_str().unwrap().replace("\"a\"", "\"z\"");
    entry["data"] = json!(data);
    tokio::fs::write(&path, entry.to_string()).await.unwrap();

    let reloaded = offline_property_store(storage);
    assert_eq!(reloaded.init().await, 0);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn test_update_preserves_created_at() {
    let (storage, dir) = temp_storage().await;
    let store = offline_property_store(storage);

    store
        .commit_local(LocalMutation::Create(input(json!({
            "id": "a",
            "title": "Alpha",
            "createdAt": "2023-05-01T10:00:00Z"
        }))))
        .await
        .unwrap();

    let notice = store
        .commit_local(LocalMutation::Update(input(json!({"id": "a", "title": "Alpha Towers"}))))
        .await
        .unwrap();
    assert!(notice.is_some());

    let record = store.get("a").await.unwrap();
    assert_eq!(record.title, "Alpha Towers");
    assert_eq!(record.created_at.to_rfc3339(), "2023-05-01T10:00:00+00:00");
    assert!(record.updated_at > record.created_at);

    let missing = store
        .commit_local(LocalMutation::Update(input(json!({"id": "nope"}))))
        .await
        .unwrap();
    assert!(missing.is_none());

    let _ = tokio::fs::remove_dir_all(&dir).await;
}
