use handoff_core::model::{DeviceCategory, DeviceProfile};
use handoff_core::{LocalCache, Store};
use tempfile::TempDir;

async fn open_store(dir: &TempDir) -> Store {
    Store::open(&dir.path().join("handoff.db"))
        .await
        .expect("open store")
}

fn cache_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("device.json")
}

#[tokio::test]
async fn initialize_device_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let mut cache = LocalCache::load(cache_path(&dir));

    let first = store.initialize_device(&mut cache).await.unwrap();
    assert!(!first.device_id.is_empty());

    let second = store.initialize_device(&mut cache).await.unwrap();
    assert_eq!(first.device_id, second.device_id);

    // The id survives a cache reload from disk.
    let mut reloaded = LocalCache::load(cache_path(&dir));
    let third = store.initialize_device(&mut reloaded).await.unwrap();
    assert_eq!(first.device_id, third.device_id);
}

#[tokio::test]
async fn setup_complete_survives_a_remote_profile_reset() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let mut cache = LocalCache::load(cache_path(&dir));

    store.initialize_device(&mut cache).await.unwrap();
    let profile = store.mark_setup_complete(&mut cache).await.unwrap();
    assert!(profile.is_setup_complete);

    // A synced reset overwrites the tier-2 blob with a factory profile.
    let factory = DeviceProfile::default();
    store.save_profile(&factory).await.unwrap();

    // Tier 1 still wins: onboarding must not re-trigger.
    let profile = store.initialize_device(&mut cache).await.unwrap();
    assert!(profile.is_setup_complete);
    assert!(!profile.device_id.is_empty());
}

#[tokio::test]
async fn device_id_is_frozen_against_remote_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let mut cache = LocalCache::load(cache_path(&dir));

    let original = store.initialize_device(&mut cache).await.unwrap();

    // Remote state tries to smuggle in a foreign device id via tier 2.
    let mut foreign = original.clone();
    foreign.device_id = "foreign-device-id".to_string();
    store.save_profile(&foreign).await.unwrap();

    let profile = store.get_profile(&cache).await.unwrap();
    assert_eq!(profile.device_id, original.device_id);
}

#[tokio::test]
async fn profile_preferences_are_last_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let mut cache = LocalCache::load(cache_path(&dir));

    let mut profile = store.initialize_device(&mut cache).await.unwrap();
    profile.device_name = "Study desktop".to_string();
    profile.category = DeviceCategory::Work;
    profile.work_mode = true;
    profile.retention_days = 14;
    store.save_profile(&profile).await.unwrap();

    let loaded = store.get_profile(&cache).await.unwrap();
    assert_eq!(loaded.device_name, "Study desktop");
    assert_eq!(loaded.category, DeviceCategory::Work);
    assert!(loaded.work_mode);
    assert_eq!(loaded.retention_days, 14);
}

#[tokio::test]
async fn cloud_url_is_persisted_in_both_tiers() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let mut cache = LocalCache::load(cache_path(&dir));
    store.initialize_device(&mut cache).await.unwrap();

    store
        .update_cloud_url(&mut cache, Some("https://sync.example.com"))
        .await
        .unwrap();

    // Tier 1 is readable synchronously before the database opens.
    let reloaded = LocalCache::load(cache_path(&dir));
    assert_eq!(reloaded.cloud_url(), Some("https://sync.example.com"));

    let profile = store.get_profile(&reloaded).await.unwrap();
    assert_eq!(
        profile.cloud_url.as_deref(),
        Some("https://sync.example.com")
    );

    // Clearing the endpoint clears both tiers.
    let mut cache = reloaded;
    store.update_cloud_url(&mut cache, None).await.unwrap();
    let reloaded = LocalCache::load(cache_path(&dir));
    assert_eq!(reloaded.cloud_url(), None);
}
