use thiserror::Error;

/// Failures reaching or authenticating with the external sync service.
///
/// These never block local store operations: they degrade the bridge's
/// status projection, and retrying is the service's own job.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync connectivity error: {0}")]
    Connectivity(#[from] reqwest::Error),

    #[error("sync service rejected the request with status {0}")]
    Rejected(u16),

    #[error("no sync endpoint configured")]
    NoEndpoint,

    #[error("token storage error: {0}")]
    TokenStore(String),
}
