use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use handoff_core::model::{
    DeviceCategory, HandoffItem, InboxFilter, ItemContent, ItemKind, ItemStatus, PlainContent,
};
use handoff_core::Store;
use handoff_sync::{
    AuthField, AuthInteraction, InteractionKind, ServiceEvent, ServicePhase, ServiceRequest,
    SyncBridge, SyncStatus,
};

async fn open_store(dir: &tempfile::TempDir) -> Store {
    Store::open(&dir.path().join("handoff.db"))
        .await
        .expect("open store")
}

fn otp_interaction() -> AuthInteraction {
    AuthInteraction {
        kind: InteractionKind::Otp,
        title: Some("Enter the code we mailed you".into()),
        alerts: vec![],
        fields: vec![AuthField {
            name: "otp".into(),
            field_type: "text".into(),
            label: Some("Code".into()),
            placeholder: Some("8 digits".into()),
        }],
        submit_label: Some("Verify".into()),
        cancel_label: Some("Cancel".into()),
    }
}

async fn next_state(
    rx: &mut tokio::sync::watch::Receiver<handoff_sync::SyncState>,
) -> handoff_sync::SyncState {
    timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("state update")
        .expect("bridge alive");
    rx.borrow_and_update().clone()
}

#[tokio::test]
async fn local_only_is_recomputed_on_endpoint_changes() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let (bridge, _requests) = SyncBridge::new(store, None);

    assert_eq!(bridge.current_state().status, SyncStatus::LocalOnly);
    assert!(!bridge.current_state().is_cloud_enabled);

    bridge.set_cloud_url(Some("https://sync.example.com".into()));
    let state = bridge.current_state();
    assert_eq!(state.status, SyncStatus::Connecting);
    assert!(state.is_cloud_enabled);

    bridge.set_cloud_url(None);
    assert_eq!(bridge.current_state().status, SyncStatus::LocalOnly);
}

#[tokio::test]
async fn service_phases_drive_the_projection() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let (bridge, _requests) =
        SyncBridge::new(store, Some("https://sync.example.com".into()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let _run = bridge.spawn(events_rx);
    let mut state_rx = bridge.sync_state();

    events_tx
        .send(ServiceEvent::Phase(ServicePhase::Pulling))
        .unwrap();
    assert_eq!(next_state(&mut state_rx).await.status, SyncStatus::Syncing);

    events_tx
        .send(ServiceEvent::Phase(ServicePhase::InSync))
        .unwrap();
    let state = next_state(&mut state_rx).await;
    assert_eq!(state.status, SyncStatus::Connected);
    assert!(state.last_sync_time.is_some());

    events_tx
        .send(ServiceEvent::Phase(ServicePhase::Error("boom".into())))
        .unwrap();
    let state = next_state(&mut state_rx).await;
    assert_eq!(state.status, SyncStatus::Error);
    assert_eq!(state.error.as_deref(), Some("boom"));
}

#[tokio::test]
async fn platform_offline_overrides_service_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let (bridge, _requests) =
        SyncBridge::new(store, Some("https://sync.example.com".into()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let _run = bridge.spawn(events_rx);
    let mut state_rx = bridge.sync_state();

    events_tx
        .send(ServiceEvent::Phase(ServicePhase::InSync))
        .unwrap();
    assert_eq!(next_state(&mut state_rx).await.status, SyncStatus::Connected);

    bridge.set_online(false);
    assert_eq!(bridge.current_state().status, SyncStatus::Offline);

    bridge.set_online(true);
    assert_eq!(bridge.current_state().status, SyncStatus::Connected);
}

#[tokio::test]
async fn a_new_interaction_replaces_the_pending_one() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let (bridge, _requests) =
        SyncBridge::new(store, Some("https://sync.example.com".into()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let _run = bridge.spawn(events_rx);
    let mut interaction_rx = bridge.interaction();

    let email = AuthInteraction {
        kind: InteractionKind::Email,
        title: Some("Sign in".into()),
        alerts: vec![],
        fields: vec![],
        submit_label: None,
        cancel_label: None,
    };
    events_tx
        .send(ServiceEvent::InteractionRequested(email))
        .unwrap();
    timeout(Duration::from_secs(5), interaction_rx.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        interaction_rx.borrow_and_update().as_ref().unwrap().kind,
        InteractionKind::Email
    );

    events_tx
        .send(ServiceEvent::InteractionRequested(otp_interaction()))
        .unwrap();
    timeout(Duration::from_secs(5), interaction_rx.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        interaction_rx.borrow_and_update().as_ref().unwrap().kind,
        InteractionKind::Otp
    );
}

#[tokio::test]
async fn failed_submit_surfaces_as_retry_with_alert() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let (bridge, mut requests) =
        SyncBridge::new(store, Some("https://sync.example.com".into()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let _run = bridge.spawn(events_rx);
    let mut interaction_rx = bridge.interaction();

    events_tx
        .send(ServiceEvent::InteractionRequested(otp_interaction()))
        .unwrap();
    timeout(Duration::from_secs(5), interaction_rx.changed())
        .await
        .unwrap()
        .unwrap();
    interaction_rx.borrow_and_update();

    let mut values = HashMap::new();
    values.insert("otp".to_string(), "00000000".to_string());
    bridge.submit_interaction(values.clone());

    // The driver sees the submit...
    let request = timeout(Duration::from_secs(5), requests.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request, ServiceRequest::SubmitInteraction { values });

    // ...the code is wrong, so the service re-delivers the interaction with
    // an error alert instead of silently closing it.
    events_tx
        .send(ServiceEvent::InteractionRequested(
            otp_interaction().with_error_alert("Invalid code"),
        ))
        .unwrap();
    timeout(Duration::from_secs(5), interaction_rx.changed())
        .await
        .unwrap()
        .unwrap();
    let pending = interaction_rx.borrow_and_update().clone().unwrap();
    assert_eq!(pending.kind, InteractionKind::Otp);
    assert_eq!(pending.alerts.len(), 1);
    assert_eq!(pending.alerts[0].message, "Invalid code");
}

#[tokio::test]
async fn cancel_clears_immediately_and_notifies_the_driver() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let (bridge, mut requests) =
        SyncBridge::new(store, Some("https://sync.example.com".into()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let _run = bridge.spawn(events_rx);
    let mut interaction_rx = bridge.interaction();

    events_tx
        .send(ServiceEvent::InteractionRequested(otp_interaction()))
        .unwrap();
    timeout(Duration::from_secs(5), interaction_rx.changed())
        .await
        .unwrap()
        .unwrap();
    interaction_rx.borrow_and_update();

    bridge.cancel_interaction();
    assert!(bridge.interaction().borrow().is_none());

    let request = timeout(Duration::from_secs(5), requests.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request, ServiceRequest::CancelInteraction);
}

#[tokio::test]
async fn observed_items_land_in_the_local_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let (bridge, _requests) =
        SyncBridge::new(store.clone(), Some("https://sync.example.com".into()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let _run = bridge.spawn(events_rx);

    let mut sub = store
        .watch_items(InboxFilter::Active, None, None)
        .await
        .unwrap();

    let item = HandoffItem {
        id: "cloud-42".into(),
        created_at: 1_700_000_000_000,
        updated_at: 1_700_000_000_000,
        sender_device_id: "phone".into(),
        sender_device_name: "Phone".into(),
        sender_category: DeviceCategory::Private,
        target_category: DeviceCategory::Any,
        target_device_id: None,
        kind: ItemKind::Url,
        status: ItemStatus::New,
        is_sensitive: false,
        content: ItemContent::Plain(PlainContent::url("https://example.com")),
        title: None,
        preview: None,
        opened_at: None,
        done_at: None,
        archived_at: None,
        owner: Some("user@example.com".into()),
        realm_id: None,
    };
    events_tx.send(ServiceEvent::ItemObserved(item)).unwrap();

    let items = timeout(Duration::from_secs(5), sub.changed())
        .await
        .expect("live query notified")
        .expect("subscription alive");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "cloud-42");

    // The sender shows up in the registry exactly like a local send.
    assert!(store.known_device("phone").await.unwrap().is_some());
}

#[tokio::test]
async fn login_and_logout_are_fire_and_forget() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let (bridge, mut requests) =
        SyncBridge::new(store, Some("https://sync.example.com".into()));

    bridge.login("user@example.com");
    bridge.logout();

    assert_eq!(
        requests.recv().await.unwrap(),
        ServiceRequest::Login {
            email: "user@example.com".into()
        }
    );
    assert_eq!(requests.recv().await.unwrap(), ServiceRequest::Logout);

    // Local operations never depend on these requests being served.
    assert_eq!(bridge.current_state().status, SyncStatus::Connecting);
}
