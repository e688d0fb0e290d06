//! Domain model shared by the store, the crypto subsystem and the sync
//! bridge. Wire names are camelCase so that locally-created items and items
//! inserted remotely through the cloud data API deserialize identically.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Enumerations ─────────────────────────────────────────────────────────────

/// Coarse-grained routing tag a device assigns itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    Work,
    Private,
    Any,
}

impl DeviceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCategory::Work => "work",
            DeviceCategory::Private => "private",
            DeviceCategory::Any => "any",
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(DeviceCategory::Work),
            "private" => Ok(DeviceCategory::Private),
            "any" => Ok(DeviceCategory::Any),
            other => Err(format!("unknown device category: {other}")),
        }
    }
}

/// Item lifecycle state. Forward-only; the single allowed back-transition is
/// the explicit user unarchive, which resets to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    New,
    Opened,
    Done,
    Archived,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::New => "new",
            ItemStatus::Opened => "opened",
            ItemStatus::Done => "done",
            ItemStatus::Archived => "archived",
        }
    }

    /// Re-entering the current state is allowed (idempotent no-op at the
    /// store layer). Everything else must be one of the listed edges.
    pub fn can_transition_to(self, next: ItemStatus) -> bool {
        use ItemStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (New, Opened)
                | (New, Archived)
                | (Opened, Done)
                | (Opened, Archived)
                | (Done, Archived)
                | (Archived, Done)
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ItemStatus::New),
            "opened" => Ok(ItemStatus::Opened),
            "done" => Ok(ItemStatus::Done),
            "archived" => Ok(ItemStatus::Archived),
            other => Err(format!("unknown item status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Url,
    Text,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Url => "url",
            ItemKind::Text => "text",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(ItemKind::Url),
            "text" => Ok(ItemKind::Text),
            other => Err(format!("unknown item kind: {other}")),
        }
    }
}

/// Inbox view filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboxFilter {
    New,
    /// Everything except archived.
    Active,
    Archived,
    All,
}

impl FromStr for InboxFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(InboxFilter::New),
            "active" => Ok(InboxFilter::Active),
            "archived" => Ok(InboxFilter::Archived),
            "all" => Ok(InboxFilter::All),
            other => Err(format!("unknown inbox filter: {other}")),
        }
    }
}

/// Passphrase retention policy. Durable ("device") retention is deliberately
/// not representable: passphrases never reach stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RememberPassphrase {
    Off,
    Session,
}

// ── Content ──────────────────────────────────────────────────────────────────

/// Parameters required to decrypt an encrypted payload. Salt and IV are
/// base64 and MUST be fresh random values for every encryption call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoParams {
    pub alg: String,
    pub key_derivation: String,
    pub salt: String,
    pub iv: String,
    pub iterations: u32,
    pub version: u32,
}

/// Unencrypted payload: exactly one of `url` / `text` is populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl PlainContent {
    pub fn url(url: impl Into<String>) -> Self {
        Self { url: Some(url.into()), text: None }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self { url: None, text: Some(text.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedContent {
    /// Base64 AES-GCM ciphertext (tag included).
    pub ciphertext: String,
    pub crypto: CryptoParams,
}

/// Item payload. The shape is decided by `HandoffItem::is_sensitive`;
/// modelling it as a sum type forces every read site to handle both arms.
/// `untagged` keeps the wire format of existing synced items: the encrypted
/// arm is tried first because its fields are mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemContent {
    Encrypted(EncryptedContent),
    Plain(PlainContent),
}

impl ItemContent {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, ItemContent::Encrypted(_))
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

/// The unit of transfer. `id` is opaque: locally a UUID, but backend-assigned
/// ids are accepted unchanged. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffItem {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub sender_device_id: String,
    pub sender_device_name: String,
    pub sender_category: DeviceCategory,
    pub target_category: DeviceCategory,
    /// Specific-device override; takes precedence over category matching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_device_id: Option<String>,
    pub kind: ItemKind,
    pub status: ItemStatus,
    pub is_sensitive: bool,
    pub content: ItemContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Derived, non-authoritative, safe to recompute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<i64>,
    /// Ownership/realm fields set by the sync backend; opaque pass-through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realm_id: Option<String>,
}

impl HandoffItem {
    pub fn plain_content(&self) -> Option<&PlainContent> {
        match &self.content {
            ItemContent::Plain(plain) => Some(plain),
            ItemContent::Encrypted(_) => None,
        }
    }
}

/// Input shape for `Store::add_item`. Id, timestamps and status are stamped
/// by the store; status always starts at `New`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub sender_device_id: String,
    pub sender_device_name: String,
    pub sender_category: DeviceCategory,
    pub target_category: DeviceCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_device_id: Option<String>,
    pub kind: ItemKind,
    pub is_sensitive: bool,
    pub content: ItemContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Per-install device identity and preferences. `device_id` is generated
/// once and frozen; it is never remote-synced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceProfile {
    pub device_id: String,
    pub device_name: String,
    pub category: DeviceCategory,
    /// Restricts outgoing items to URLs.
    pub work_mode: bool,
    pub retention_days: u32,
    pub default_target_category: DeviceCategory,
    pub remember_passphrase: RememberPassphrase,
    pub is_setup_complete: bool,
    pub enable_browser_notifications: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_url: Option<String>,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            device_name: String::new(),
            category: DeviceCategory::Any,
            work_mode: false,
            retention_days: 7,
            default_target_category: DeviceCategory::Any,
            remember_passphrase: RememberPassphrase::Off,
            is_setup_complete: false,
            enable_browser_notifications: false,
            cloud_url: None,
        }
    }
}

pub const RETENTION_DAYS_MIN: u32 = 1;
pub const RETENTION_DAYS_MAX: u32 = 30;

impl DeviceProfile {
    pub fn validate(&self) -> Result<(), crate::error::ValidationError> {
        if self.retention_days < RETENTION_DAYS_MIN || self.retention_days > RETENTION_DAYS_MAX {
            return Err(crate::error::ValidationError::RetentionOutOfRange(
                self.retention_days,
            ));
        }
        Ok(())
    }
}

/// Side record of a device that has ever sent us an item. Pure cache,
/// reconstructable from item history; never a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownDevice {
    pub device_id: String,
    pub device_name: String,
    pub category: DeviceCategory,
    pub last_seen: i64,
}

/// Externally supplied payload parsed from a deep link or OS share target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePayload {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<DeviceCategory>,
    pub sensitive: bool,
    pub auto_send: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_matches_state_machine() {
        use ItemStatus::*;
        let allowed = [
            (New, Opened),
            (New, Archived),
            (Opened, Done),
            (Opened, Archived),
            (Done, Archived),
            (Archived, Done),
        ];
        let all = [New, Opened, Done, Archived];
        for from in all {
            for to in all {
                let expected = from == to || allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn content_union_roundtrips_both_shapes() {
        let plain = ItemContent::Plain(PlainContent::url("https://example.com"));
        let json = serde_json::to_string(&plain).unwrap();
        assert_eq!(json, r#"{"url":"https://example.com"}"#);
        assert_eq!(serde_json::from_str::<ItemContent>(&json).unwrap(), plain);

        let encrypted = ItemContent::Encrypted(EncryptedContent {
            ciphertext: "AAEC".into(),
            crypto: CryptoParams {
                alg: "AES-GCM".into(),
                key_derivation: "PBKDF2".into(),
                salt: "c2FsdA==".into(),
                iv: "aXY=".into(),
                iterations: 100_000,
                version: 1,
            },
        });
        let json = serde_json::to_string(&encrypted).unwrap();
        let back: ItemContent = serde_json::from_str(&json).unwrap();
        assert!(back.is_encrypted());
    }

    #[test]
    fn profile_merges_missing_fields_over_defaults() {
        let profile: DeviceProfile =
            serde_json::from_str(r#"{"deviceId":"d1","category":"work"}"#).unwrap();
        assert_eq!(profile.device_id, "d1");
        assert_eq!(profile.category, DeviceCategory::Work);
        assert_eq!(profile.retention_days, 7);
        assert_eq!(profile.remember_passphrase, RememberPassphrase::Off);
    }

    #[test]
    fn profile_rejects_out_of_range_retention() {
        let mut profile = DeviceProfile::default();
        profile.retention_days = 0;
        assert!(profile.validate().is_err());
        profile.retention_days = 31;
        assert!(profile.validate().is_err());
        profile.retention_days = 30;
        assert!(profile.validate().is_ok());
    }
}
