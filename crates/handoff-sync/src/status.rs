//! Connection-status projection.
//!
//! The external service's phase reports and the platform connectivity signal
//! collapse into one small client-observable enumeration.

use serde::{Deserialize, Serialize};

/// Client-observable connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// No endpoint configured. Entered and exited only by configuration
    /// changes, never by service events.
    LocalOnly,
    Connecting,
    Connected,
    Syncing,
    /// Platform reports no connectivity; wins over any service phase.
    Offline,
    Disconnected,
    Error,
}

/// Phase as reported by the external synchronization service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServicePhase {
    /// Nothing reported yet.
    Initial,
    Connecting,
    Pushing,
    Pulling,
    InSync,
    Offline,
    Disconnected,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub status: SyncStatus,
    pub is_cloud_enabled: bool,
    pub last_sync_time: Option<i64>,
    pub error: Option<String>,
}

impl SyncState {
    pub fn local_only() -> Self {
        Self {
            status: SyncStatus::LocalOnly,
            is_cloud_enabled: false,
            last_sync_time: None,
            error: None,
        }
    }
}

/// Collapse configuration, connectivity and service phase into a status.
/// Precedence: endpoint configuration, then the platform signal, then
/// whatever the service reports.
pub fn project(cloud_enabled: bool, online: bool, phase: &ServicePhase) -> SyncStatus {
    if !cloud_enabled {
        return SyncStatus::LocalOnly;
    }
    if !online {
        return SyncStatus::Offline;
    }
    match phase {
        ServicePhase::Initial | ServicePhase::Connecting => SyncStatus::Connecting,
        ServicePhase::Pushing | ServicePhase::Pulling => SyncStatus::Syncing,
        ServicePhase::InSync => SyncStatus::Connected,
        ServicePhase::Offline => SyncStatus::Offline,
        ServicePhase::Disconnected => SyncStatus::Disconnected,
        ServicePhase::Error(_) => SyncStatus::Error,
    }
}
