//! Identity & profile store.
//!
//! Two tiers, reconciled in one direction only:
//!
//! - **Tier 1**: [`LocalCache`], a small synchronous JSON file outside the
//!   database. Authoritative for the identity-critical fields (`device_id`,
//!   `setup_complete`, `cloud_url`): a cross-device reset of the synced
//!   database must never re-trigger onboarding or mint a new device id.
//! - **Tier 2**: the `persisted_state` table, key `deviceProfile`.
//!   Authoritative for preferences; last-write-wins, no merge logic.
//!
//! Tier 2 is always reconciled toward tier 1, never the reverse.

use std::path::PathBuf;

use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::DeviceProfile;

use super::{now_ms, Store, TableChange};

const PROFILE_KEY: &str = "deviceProfile";

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CachedIdentity {
    device_id: Option<String>,
    setup_complete: bool,
    cloud_url: Option<String>,
}

/// Tier-1 identity cache. Reads are infallible: a missing or unreadable file
/// yields defaults, the same as a first run.
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
    state: CachedIdentity,
}

impl LocalCache {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = std::fs::read_to_string(&path)
            .ok()
            .and_then(|data| serde_json::from_str(&data).ok())
            .unwrap_or_default();
        Self { path, state }
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }

    pub fn device_id(&self) -> Option<&str> {
        self.state.device_id.as_deref()
    }

    pub fn setup_complete(&self) -> bool {
        self.state.setup_complete
    }

    pub fn cloud_url(&self) -> Option<&str> {
        self.state.cloud_url.as_deref()
    }

    /// Assign the device id exactly once; later calls are no-ops.
    pub fn assign_device_id(&mut self, device_id: &str) -> Result<(), StoreError> {
        if self.state.device_id.is_none() {
            self.state.device_id = Some(device_id.to_string());
            self.save()?;
        }
        Ok(())
    }

    /// Setup completion only ever moves forward.
    pub fn mark_setup_complete(&mut self) -> Result<(), StoreError> {
        if !self.state.setup_complete {
            self.state.setup_complete = true;
            self.save()?;
        }
        Ok(())
    }

    pub fn set_cloud_url(&mut self, url: Option<&str>) -> Result<(), StoreError> {
        let url = url.map(str::trim).filter(|u| !u.is_empty());
        self.state.cloud_url = url.map(str::to_string);
        self.save()
    }
}

impl Store {
    /// Load the profile, merging stored fields over defaults and reconciling
    /// the identity-critical fields from tier 1.
    pub async fn get_profile(&self, cache: &LocalCache) -> Result<DeviceProfile, StoreError> {
        let row = sqlx::query("SELECT value FROM persisted_state WHERE key = ?1")
            .bind(PROFILE_KEY)
            .fetch_optional(self.pool())
            .await?;

        let mut profile: DeviceProfile = match row {
            Some(row) => serde_json::from_str(&row.try_get::<String, _>("value")?)?,
            None => DeviceProfile::default(),
        };

        if let Some(device_id) = cache.device_id() {
            profile.device_id = device_id.to_string();
        }
        if cache.setup_complete() {
            profile.is_setup_complete = true;
        }
        if let Some(url) = cache.cloud_url() {
            profile.cloud_url = Some(url.to_string());
        }
        Ok(profile)
    }

    /// Persist the profile blob. Last-write-wins; identity fields remain
    /// governed by tier 1 on the next load.
    pub async fn save_profile(&self, profile: &DeviceProfile) -> Result<(), StoreError> {
        let value = serde_json::to_string(profile)?;
        sqlx::query(
            "INSERT INTO persisted_state (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             updated_at = excluded.updated_at",
        )
        .bind(PROFILE_KEY)
        .bind(value)
        .bind(now_ms())
        .execute(self.pool())
        .await?;
        self.notify(TableChange::Profile);
        Ok(())
    }

    /// Idempotent device bootstrap. The id is generated once, written to
    /// tier 1 first, and never changes afterwards, whatever remote state
    /// later lands in tier 2.
    pub async fn initialize_device(
        &self,
        cache: &mut LocalCache,
    ) -> Result<DeviceProfile, StoreError> {
        let mut profile = self.get_profile(cache).await?;

        if cache.device_id().is_none() {
            let device_id = if profile.device_id.is_empty() {
                let id = Uuid::new_v4().to_string();
                info!(device_id = %id, "assigned new device id");
                id
            } else {
                // Tier 2 survived but tier 1 was lost; repopulate tier 1.
                profile.device_id.clone()
            };
            cache.assign_device_id(&device_id)?;
            profile.device_id = device_id;
        }

        self.save_profile(&profile).await?;
        Ok(profile)
    }

    /// Record setup completion in both tiers.
    pub async fn mark_setup_complete(
        &self,
        cache: &mut LocalCache,
    ) -> Result<DeviceProfile, StoreError> {
        cache.mark_setup_complete()?;
        let mut profile = self.get_profile(cache).await?;
        profile.is_setup_complete = true;
        self.save_profile(&profile).await?;
        Ok(profile)
    }

    /// Persist a new sync endpoint. Takes full effect only once the store and
    /// sync bridge are re-opened; a partial hot swap is not attempted.
    pub async fn update_cloud_url(
        &self,
        cache: &mut LocalCache,
        url: Option<&str>,
    ) -> Result<(), StoreError> {
        cache.set_cloud_url(url)?;
        let mut profile = self.get_profile(cache).await?;
        profile.cloud_url = cache.cloud_url().map(str::to_string);
        self.save_profile(&profile).await
    }

    /// Generic persisted state, for callers that keep small UI state blobs.
    pub async fn get_state<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        let row = sqlx::query("SELECT value FROM persisted_state WHERE key = ?1")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;
        match row {
            Some(row) => Ok(Some(serde_json::from_str(
                &row.try_get::<String, _>("value")?,
            )?)),
            None => Ok(None),
        }
    }

    pub async fn set_state<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO persisted_state (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(serde_json::to_string(value)?)
        .bind(now_ms())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
