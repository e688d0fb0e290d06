//! handoff-sync — the bridge between the local store and an external
//! synchronization service.
//!
//! The service itself (transport, retries, conflict-free merging) is an
//! external collaborator. This crate projects its state into a small
//! observable [`SyncState`], relays interactive auth prompts, forwards
//! fire-and-forget login/logout, and feeds items observed on the sync
//! channel into the local store. None of it may block local reads/writes.

pub mod auth;
pub mod bridge;
pub mod client;
pub mod error;
pub mod status;
pub mod token_store;

pub use auth::{AlertSeverity, AuthAlert, AuthField, AuthInteraction, InteractionKind};
pub use bridge::{ServiceEvent, ServiceRequest, SyncBridge};
pub use client::CloudClient;
pub use error::SyncError;
pub use status::{ServicePhase, SyncState, SyncStatus};
