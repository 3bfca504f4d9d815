//! Status command - show repository and sync state.

use anyhow::Result;
use vault_core::modification_fingerprint;
use vault_sync::format_transfer_code;

use super::{short_id, Workspace};

/// Show repository, cloud and transfer code status.
pub async fn run(ws: &Workspace) -> Result<()> {
    println!("NoteVault Status");
    println!("================");
    println!();

    // Repository
    if !ws.is_initialized() {
        println!("Repository: Not initialized");
        println!("  Run 'notevault init' to create one.");
        return Ok(());
    }
    let repo = ws.load_repository().await?;
    let locked = repo.notes.iter().filter(|n| n.safe_id.is_some()).count();
    println!("Repository:");
    println!("  ID: {}", short_id(repo.id));
    println!("  Notes: {} ({} locked)", repo.notes.len(), locked);
    println!("  Deleted: {}", repo.deleted_notes.len());
    println!("  Safes: {}", repo.safes.len());
    println!();

    // Cloud
    let settings = ws.load_settings().await?;
    match &settings.cloud {
        Some(cloud) => {
            println!("Cloud:");
            println!("  Location: {}", cloud.location);
            println!("  File: {}", ws.config().cloud_file);
        }
        None => {
            println!("Cloud: Not connected");
            println!("  Run 'notevault connect <dir>' to set one up.");
        }
    }
    println!();

    // Sync state
    println!("Sync:");
    match &settings.transfer_code {
        Some(code) => println!("  Transfer code: {}", format_transfer_code(code)),
        None => println!("  Transfer code: none"),
    }
    if !settings.transfer_code_history.is_empty() {
        println!(
            "  Previous codes: {}",
            settings.transfer_code_history.len()
        );
    }
    let state = match settings.last_sync_fingerprint {
        None => "never synchronized",
        Some(fp) if fp == modification_fingerprint(&repo) => "up to date",
        Some(_) => "local changes pending",
    };
    println!("  State: {}", state);
    println!("  Encryption: {} / {}", settings.cipher, settings.kdf);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{init, notes, test_support::workspace};
    use tempfile::tempdir;

    #[tokio::test]
    async fn status_without_init() {
        let dir = tempdir().unwrap();
        let ws = workspace(dir.path());
        run(&ws).await.unwrap();
    }

    #[tokio::test]
    async fn status_with_notes() {
        let dir = tempdir().unwrap();
        let ws = workspace(dir.path());
        init::run(&ws).await.unwrap();
        notes::add(&ws, "note", &[]).await.unwrap();
        run(&ws).await.unwrap();
    }
}
