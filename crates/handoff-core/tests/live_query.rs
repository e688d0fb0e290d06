use std::time::Duration;

use handoff_core::model::{
    DeviceCategory, InboxFilter, ItemContent, ItemKind, ItemStatus, NewItem, PlainContent,
};
use handoff_core::Store;
use tempfile::TempDir;

async fn open_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(&dir.path().join("handoff.db"))
        .await
        .expect("open store");
    (dir, store)
}

fn text_item() -> NewItem {
    NewItem {
        sender_device_id: "sender".to_string(),
        sender_device_name: "Sender".to_string(),
        sender_category: DeviceCategory::Any,
        target_category: DeviceCategory::Any,
        target_device_id: None,
        kind: ItemKind::Text,
        is_sensitive: false,
        content: ItemContent::Plain(PlainContent::text("hello")),
        title: None,
        preview: None,
    }
}

#[tokio::test]
async fn subscription_replays_query_after_writes() {
    let (_dir, store) = open_store().await;
    let mut sub = store
        .watch_items(InboxFilter::Active, None, None)
        .await
        .unwrap();
    assert!(sub.current().is_empty());

    let id = store.add_item(text_item()).await.unwrap();
    let items = tokio::time::timeout(Duration::from_secs(5), sub.changed())
        .await
        .expect("subscription notified")
        .expect("subscription alive");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, id);

    // Archiving removes the item from the active view.
    store
        .update_status(&id, ItemStatus::Archived)
        .await
        .unwrap();
    let items = tokio::time::timeout(Duration::from_secs(5), sub.changed())
        .await
        .expect("subscription notified")
        .expect("subscription alive");
    assert!(items.is_empty());
}

#[tokio::test]
async fn subscription_respects_targeting() {
    let (_dir, store) = open_store().await;
    let mut sub = store
        .watch_items(InboxFilter::All, Some(DeviceCategory::Private), None)
        .await
        .unwrap();

    // A work-targeted item changes the table but not this result set; a
    // matching item arriving afterwards must still come through.
    let mut work_item = text_item();
    work_item.target_category = DeviceCategory::Work;
    store.add_item(work_item).await.unwrap();

    let mut private_item = text_item();
    private_item.target_category = DeviceCategory::Private;
    let id = store.add_item(private_item).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let items = tokio::time::timeout_at(deadline, sub.changed())
            .await
            .expect("subscription notified")
            .expect("subscription alive");
        if items.iter().any(|item| item.id == id) {
            assert_eq!(items.len(), 1);
            break;
        }
    }
}

#[tokio::test]
async fn cancelled_subscription_stops_replaying() {
    let (_dir, store) = open_store().await;
    let mut sub = store
        .watch_items(InboxFilter::All, None, None)
        .await
        .unwrap();
    sub.cancel();

    store.add_item(text_item()).await.unwrap();
    assert!(sub.changed().await.is_none());
}
