//! Handoff item operations: insert, status transitions, filtered queries,
//! retention sweep, bulk delete.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    DeviceCategory, HandoffItem, InboxFilter, ItemContent, ItemStatus, KnownDevice, NewItem,
};

use super::{now_ms, Store, TableChange};

const ITEM_COLUMNS: &str = "id, created_at, updated_at, sender_device_id, sender_device_name, \
     sender_category, target_category, target_device_id, kind, status, is_sensitive, content, \
     title, preview, opened_at, done_at, archived_at, owner, realm_id";

fn item_from_row(row: &SqliteRow) -> Result<HandoffItem, StoreError> {
    let content_json: String = row.try_get("content")?;
    let content: ItemContent = serde_json::from_str(&content_json)?;

    let sender_category: String = row.try_get("sender_category")?;
    let target_category: String = row.try_get("target_category")?;
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;

    Ok(HandoffItem {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        sender_device_id: row.try_get("sender_device_id")?,
        sender_device_name: row.try_get("sender_device_name")?,
        sender_category: sender_category.parse().map_err(StoreError::Decode)?,
        target_category: target_category.parse().map_err(StoreError::Decode)?,
        target_device_id: row.try_get("target_device_id")?,
        kind: kind.parse().map_err(StoreError::Decode)?,
        status: status.parse().map_err(StoreError::Decode)?,
        is_sensitive: row.try_get("is_sensitive")?,
        content,
        title: row.try_get("title")?,
        preview: row.try_get("preview")?,
        opened_at: row.try_get("opened_at")?,
        done_at: row.try_get("done_at")?,
        archived_at: row.try_get("archived_at")?,
        owner: row.try_get("owner")?,
        realm_id: row.try_get("realm_id")?,
    })
}

impl Store {
    /// Insert a locally-created item. Stamps `created_at = updated_at = now`,
    /// initializes status to `new` and upserts the sender into the device
    /// registry in the same transaction. Purely local; never blocks on the
    /// network.
    pub async fn add_item(&self, item: NewItem) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = now_ms();
        let content_json = serde_json::to_string(&item.content)?;

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO handoff_items (id, created_at, updated_at, sender_device_id, \
             sender_device_name, sender_category, target_category, target_device_id, kind, \
             status, is_sensitive, content, title, preview) \
             VALUES (?1, ?2, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(&id)
        .bind(now)
        .bind(&item.sender_device_id)
        .bind(&item.sender_device_name)
        .bind(item.sender_category.as_str())
        .bind(item.target_category.as_str())
        .bind(&item.target_device_id)
        .bind(item.kind.as_str())
        .bind(ItemStatus::New.as_str())
        .bind(item.is_sensitive)
        .bind(&content_json)
        .bind(&item.title)
        .bind(&item.preview)
        .execute(&mut *tx)
        .await?;

        upsert_device_tx(
            &mut tx,
            &KnownDevice {
                device_id: item.sender_device_id.clone(),
                device_name: item.sender_device_name.clone(),
                category: item.sender_category,
                last_seen: now,
            },
        )
        .await?;
        tx.commit().await?;

        debug!(%id, kind = %item.kind, "item added");
        self.notify(TableChange::Items);
        self.notify(TableChange::Devices);
        Ok(id)
    }

    /// Upsert an item observed through the sync channel. Backend-assigned ids
    /// are kept as-is; once stored, the item is indistinguishable from a
    /// locally-created one.
    pub async fn apply_remote(&self, item: &HandoffItem) -> Result<(), StoreError> {
        let content_json = serde_json::to_string(&item.content)?;

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO handoff_items (id, created_at, updated_at, sender_device_id, \
             sender_device_name, sender_category, target_category, target_device_id, kind, \
             status, is_sensitive, content, title, preview, opened_at, done_at, archived_at, \
             owner, realm_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
             ?18, ?19) \
             ON CONFLICT(id) DO UPDATE SET \
                updated_at = excluded.updated_at, status = excluded.status, \
                content = excluded.content, title = excluded.title, preview = excluded.preview, \
                opened_at = excluded.opened_at, done_at = excluded.done_at, \
                archived_at = excluded.archived_at, owner = excluded.owner, \
                realm_id = excluded.realm_id",
        )
        .bind(&item.id)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(&item.sender_device_id)
        .bind(&item.sender_device_name)
        .bind(item.sender_category.as_str())
        .bind(item.target_category.as_str())
        .bind(&item.target_device_id)
        .bind(item.kind.as_str())
        .bind(item.status.as_str())
        .bind(item.is_sensitive)
        .bind(&content_json)
        .bind(&item.title)
        .bind(&item.preview)
        .bind(item.opened_at)
        .bind(item.done_at)
        .bind(item.archived_at)
        .bind(&item.owner)
        .bind(&item.realm_id)
        .execute(&mut *tx)
        .await?;

        upsert_device_tx(
            &mut tx,
            &KnownDevice {
                device_id: item.sender_device_id.clone(),
                device_name: item.sender_device_name.clone(),
                category: item.sender_category,
                last_seen: now_ms(),
            },
        )
        .await?;
        tx.commit().await?;

        debug!(id = %item.id, "remote item applied");
        self.notify(TableChange::Items);
        self.notify(TableChange::Devices);
        Ok(())
    }

    pub async fn get_item(&self, id: &str) -> Result<Option<HandoffItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM handoff_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    /// Apply a status transition. Listed transitions succeed unconditionally;
    /// re-entering the current state is an idempotent no-op; anything else is
    /// an [`StoreError::InvalidTransition`]. Each `*_at` timestamp is stamped
    /// only the first time its state is entered.
    pub async fn update_status(&self, id: &str, new_status: ItemStatus) -> Result<(), StoreError> {
        let row = sqlx::query("SELECT status FROM handoff_items WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        let Some(row) = row else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        let current: ItemStatus = row
            .try_get::<String, _>("status")?
            .parse()
            .map_err(StoreError::Decode)?;

        if !current.can_transition_to(new_status) {
            return Err(StoreError::InvalidTransition {
                from: current,
                to: new_status,
            });
        }
        if current == new_status {
            return Ok(());
        }

        let sql = match new_status {
            ItemStatus::Opened => {
                "UPDATE handoff_items SET status = ?1, updated_at = ?2, \
                 opened_at = COALESCE(opened_at, ?2) WHERE id = ?3"
            }
            ItemStatus::Done => {
                "UPDATE handoff_items SET status = ?1, updated_at = ?2, \
                 done_at = COALESCE(done_at, ?2) WHERE id = ?3"
            }
            ItemStatus::Archived => {
                "UPDATE handoff_items SET status = ?1, updated_at = ?2, \
                 archived_at = COALESCE(archived_at, ?2) WHERE id = ?3"
            }
            // Unreachable through the transition table; kept total.
            ItemStatus::New => "UPDATE handoff_items SET status = ?1, updated_at = ?2 WHERE id = ?3",
        };
        sqlx::query(sql)
            .bind(new_status.as_str())
            .bind(now_ms())
            .bind(id)
            .execute(self.pool())
            .await?;

        debug!(%id, from = %current, to = %new_status, "status transition");
        self.notify(TableChange::Items);
        Ok(())
    }

    /// Query items newest-first, with the status filter applied in SQL and
    /// the targeting overlay applied afterwards.
    pub async fn items_by_filter(
        &self,
        filter: InboxFilter,
        device_category: Option<DeviceCategory>,
        device_id: Option<&str>,
    ) -> Result<Vec<HandoffItem>, StoreError> {
        let sql = match filter {
            InboxFilter::New => format!(
                "SELECT {ITEM_COLUMNS} FROM handoff_items WHERE status = 'new' \
                 ORDER BY created_at DESC"
            ),
            InboxFilter::Active => format!(
                "SELECT {ITEM_COLUMNS} FROM handoff_items WHERE status != 'archived' \
                 ORDER BY created_at DESC"
            ),
            InboxFilter::Archived => format!(
                "SELECT {ITEM_COLUMNS} FROM handoff_items WHERE status = 'archived' \
                 ORDER BY created_at DESC"
            ),
            InboxFilter::All => {
                format!("SELECT {ITEM_COLUMNS} FROM handoff_items ORDER BY created_at DESC")
            }
        };

        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;
        let mut items = rows
            .iter()
            .map(item_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        items.retain(|item| matches_target(item, device_category, device_id));
        Ok(items)
    }

    /// Archive every non-archived item older than the retention window.
    /// A single UPDATE: snapshot-consistent, idempotent, and safe to run
    /// concurrently with reads — it only moves items toward the terminal
    /// state. Returns the number of items archived.
    pub async fn run_retention_cleanup(&self, retention_days: u32) -> Result<u64, StoreError> {
        let now = now_ms();
        let cutoff = now - i64::from(retention_days) * 86_400_000;
        let result = sqlx::query(
            "UPDATE handoff_items SET status = 'archived', \
             archived_at = COALESCE(archived_at, ?1), updated_at = ?1 \
             WHERE created_at < ?2 AND status != 'archived'",
        )
        .bind(now)
        .bind(cutoff)
        .execute(self.pool())
        .await?;

        let count = result.rows_affected();
        if count > 0 {
            info!(count, retention_days, "retention sweep archived stale items");
            self.notify(TableChange::Items);
        }
        Ok(count)
    }

    /// Irreversibly delete all archived items. Returns the number deleted.
    pub async fn clear_archived(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM handoff_items WHERE status = 'archived'")
            .execute(self.pool())
            .await?;
        let count = result.rows_affected();
        if count > 0 {
            info!(count, "cleared archived items");
            self.notify(TableChange::Items);
        }
        Ok(count)
    }

    /// Unconditional hard delete.
    pub async fn delete_item(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM handoff_items WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() > 0 {
            self.notify(TableChange::Items);
        }
        Ok(())
    }
}

/// Targeting overlay, applied after the status filter.
///
/// Device-pinned items are exclusive: they match only when the caller
/// presents exactly that device id, and category-only callers never see them.
/// Unpinned items fall back to category matching, where an `any` target or an
/// `any` caller matches everything.
fn matches_target(
    item: &HandoffItem,
    device_category: Option<DeviceCategory>,
    device_id: Option<&str>,
) -> bool {
    if let Some(caller_id) = device_id {
        return match &item.target_device_id {
            Some(target) => target == caller_id,
            None => category_match(item.target_category, device_category),
        };
    }
    if let Some(caller_category) = device_category {
        if item.target_device_id.is_some() {
            return false;
        }
        return category_match(item.target_category, Some(caller_category));
    }
    // No targeting context supplied: raw listing.
    true
}

fn category_match(target: DeviceCategory, caller: Option<DeviceCategory>) -> bool {
    match caller {
        None | Some(DeviceCategory::Any) => true,
        Some(category) => target == DeviceCategory::Any || target == category,
    }
}

async fn upsert_device_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    device: &KnownDevice,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO known_devices (device_id, device_name, category, last_seen) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(device_id) DO UPDATE SET device_name = excluded.device_name, \
         category = excluded.category, last_seen = excluded.last_seen",
    )
    .bind(&device.device_id)
    .bind(&device.device_name)
    .bind(device.category.as_str())
    .bind(device.last_seen)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
