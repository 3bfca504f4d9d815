//! Configure directory-backed cloud storage.

use anyhow::{Context, Result};
use std::path::Path;
use vault_sync::{CloudCredentials, SettingsStore};

use super::Workspace;

/// Store `dir` as the cloud location.
pub async fn run(ws: &Workspace, dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .context("Failed to create cloud directory")?;
    let dir = tokio::fs::canonicalize(dir)
        .await
        .context("Failed to resolve cloud directory")?;

    let store = ws.settings();
    let mut settings = ws.load_settings().await?;
    let changed = settings
        .cloud
        .as_ref()
        .is_some_and(|c| Path::new(&c.location) != dir.as_path());

    settings.cloud = Some(CloudCredentials::new(dir.display().to_string()));
    if changed {
        // A different cloud means a different repository.
        settings.last_sync_fingerprint = None;
    }
    store
        .save(&settings)
        .await
        .context("Failed to save settings")?;

    println!("Cloud storage set to {}", dir.display());
    println!();
    println!("Run 'notevault sync' to synchronize.");
    Ok(())
}
