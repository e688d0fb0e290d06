//! Device registry: a side-table of devices that have ever sent an item.
//! Pure cache for display and targeting pickers; reconstructable from item
//! history and never a source of truth.

use sqlx::Row;

use crate::error::StoreError;
use crate::model::KnownDevice;

use super::{Store, TableChange};

impl Store {
    /// Upsert a device record, refreshing `last_seen`.
    pub async fn register_device(&self, device: &KnownDevice) -> Result<(), StoreError> {
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
        .execute(self.pool())
        .await?;
        self.notify(TableChange::Devices);
        Ok(())
    }

    /// All known devices, most recently seen first.
    pub async fn known_devices(&self) -> Result<Vec<KnownDevice>, StoreError> {
        let rows = sqlx::query(
            "SELECT device_id, device_name, category, last_seen FROM known_devices \
             ORDER BY last_seen DESC",
        )
        .fetch_all(self.pool())
        .await?;
        rows.iter()
            .map(|row| {
                let category: String = row.try_get("category")?;
                Ok(KnownDevice {
                    device_id: row.try_get("device_id")?,
                    device_name: row.try_get("device_name")?,
                    category: category.parse().map_err(StoreError::Decode)?,
                    last_seen: row.try_get("last_seen")?,
                })
            })
            .collect()
    }

    pub async fn known_device(&self, device_id: &str) -> Result<Option<KnownDevice>, StoreError> {
        let row = sqlx::query(
            "SELECT device_id, device_name, category, last_seen FROM known_devices \
             WHERE device_id = ?1",
        )
        .bind(device_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(|row| {
            let category: String = row.try_get("category")?;
            Ok(KnownDevice {
                device_id: row.try_get("device_id")?,
                device_name: row.try_get("device_name")?,
                category: category.parse().map_err(StoreError::Decode)?,
                last_seen: row.try_get("last_seen")?,
            })
        })
        .transpose()
    }
}
