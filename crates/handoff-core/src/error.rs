use thiserror::Error;

use crate::model::ItemStatus;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Fail-fast on unknown format versions; no attempt to guess.
    #[error("unsupported encryption format version {0}")]
    UnsupportedVersion(u32),

    /// Wrong passphrase and corrupted/tampered ciphertext are reported
    /// identically; the GCM tag does not distinguish them.
    #[error("decryption failed: wrong passphrase or corrupted data")]
    DecryptFailed,

    #[error("encryption failed")]
    EncryptFailed,

    #[error("serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("record not found: {0}")]
    NotFound(String),

    /// Logic error: the caller attempted a transition the state machine
    /// does not list. Surfaced, never silently coerced.
    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition { from: ItemStatus, to: ItemStatus },

    /// Corrupt enum value or content blob in a stored row.
    #[error("corrupt record: {0}")]
    Decode(String),

    /// Tier-1 identity cache file I/O.
    #[error("local cache error: {0}")]
    Cache(#[from] std::io::Error),

    #[error("serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("content is empty")]
    EmptyContent,

    #[error("work mode is enabled: only URLs may be sent")]
    WorkModeUrlOnly,

    #[error("invalid URL (must start with http:// or https://): {0}")]
    InvalidUrl(String),

    #[error("a passphrase is required for sensitive items")]
    MissingPassphrase,

    #[error("passphrases do not match")]
    PassphraseMismatch,

    #[error("passphrase must be at least {min} characters")]
    PassphraseTooShort { min: usize },

    #[error("retention days must be within 1-30, got {0}")]
    RetentionOutOfRange(u32),
}

/// Errors from assembling an outgoing item (validation + optional encryption).
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
