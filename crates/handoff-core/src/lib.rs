//! handoff-core — local-first handoff inbox.
//!
//! The authoritative local data layer: a SQLite item store with live
//! queries, the two-tier device identity/profile store, the device
//! registry, client-side content encryption for sensitive items, and the
//! share-ingestion/composition helpers that feed the store.
//!
//! # Encryption strategy
//! SQLite does not natively encrypt. Sensitive item payloads are stored as
//! AES-256-GCM ciphertext (PBKDF2-derived key, per-item random salt and IV),
//! base64-encoded inside the content JSON. Non-sensitive metadata stays in
//! plaintext columns for efficient queries. Passphrases live at most for the
//! process lifetime in [`session::SessionPassphrase`].
//!
//! # Local-first contract
//! Every store operation succeeds or fails against the local database alone;
//! remote connectivity is projected by the separate sync bridge crate and
//! never surfaces as a store error.

pub mod compose;
pub mod crypto;
pub mod error;
pub mod model;
pub mod paths;
pub mod session;
pub mod share;
pub mod store;

pub use error::{ComposeError, CryptoError, StoreError, ValidationError};
pub use model::{
    DeviceCategory, DeviceProfile, HandoffItem, InboxFilter, ItemContent, ItemKind, ItemStatus,
    KnownDevice, NewItem, PlainContent, SharePayload,
};
pub use session::SessionPassphrase;
pub use store::{ItemsSubscription, LocalCache, Store, TableChange};
