//! Sync auth token at rest, in the OS keyring.
//!
//! The token is the only sync credential this client persists; passphrases
//! never get this treatment.

use keyring::Entry;

use crate::error::SyncError;

const SERVICE_NAME: &str = "Handoff";
const TOKEN_KEY: &str = "sync_token";

fn entry(device_id: &str) -> Result<Entry, SyncError> {
    Entry::new(SERVICE_NAME, &format!("{TOKEN_KEY}:{device_id}"))
        .map_err(|e| SyncError::TokenStore(e.to_string()))
}

pub fn store_sync_token(device_id: &str, token: &str) -> Result<(), SyncError> {
    entry(device_id)?
        .set_password(token)
        .map_err(|e| SyncError::TokenStore(e.to_string()))
}

pub fn get_sync_token(device_id: &str) -> Result<Option<String>, SyncError> {
    match entry(device_id)?.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(SyncError::TokenStore(e.to_string())),
    }
}

pub fn delete_sync_token(device_id: &str) -> Result<(), SyncError> {
    match entry(device_id)?.delete_password() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(SyncError::TokenStore(e.to_string())),
    }
}
