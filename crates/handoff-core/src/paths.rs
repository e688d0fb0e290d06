use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "io";
pub const APP_ORG: &str = "handoff";
pub const APP_NAME: &str = "handoff";

pub fn data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(override_path) = std::env::var("HANDOFF_DATA_DIR") {
        return Ok(PathBuf::from(override_path));
    }
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn db_path() -> anyhow::Result<PathBuf> {
    Ok(data_dir()?.join("handoff.db"))
}

/// Tier-1 identity cache, deliberately outside the syncable database.
pub fn local_cache_path() -> anyhow::Result<PathBuf> {
    Ok(data_dir()?.join("device.json"))
}
