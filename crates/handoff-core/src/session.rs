//! Session-scoped passphrase cache.
//!
//! Process lifetime only: nothing here is ever serialized, and the cached
//! value is zeroized on drop. Populated only when the profile opts into
//! `rememberPassphrase = session`.

use parking_lot::RwLock;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::model::{DeviceProfile, RememberPassphrase};

/// Thread-safe handle; clone to share.
#[derive(Clone, Default)]
pub struct SessionPassphrase {
    inner: Arc<RwLock<Option<Zeroizing<String>>>>,
}

impl SessionPassphrase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the passphrase for the rest of the process, if the profile
    /// allows it. A profile set to `off` makes this a no-op.
    pub fn remember(&self, profile: &DeviceProfile, passphrase: &str) {
        if profile.remember_passphrase == RememberPassphrase::Session {
            *self.inner.write() = Some(Zeroizing::new(passphrase.to_string()));
        }
    }

    pub fn get(&self) -> Option<Zeroizing<String>> {
        self.inner.read().clone()
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    /// Drop the cached value early when the user disables session caching.
    pub fn apply_preference(&self, profile: &DeviceProfile) {
        if profile.remember_passphrase != RememberPassphrase::Session {
            self.clear();
        }
    }
}
