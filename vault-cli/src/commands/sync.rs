//! Synchronization commands.

use anyhow::{Context, Result};
use vault_core::{NoteMergeOutcome, UiMode};
use vault_sync::{RepositoryChoice, SyncOutcome, SyncRequest};
use zeroize::Zeroizing;

use super::{resolve_note_id, short_id, Workspace};

/// Options of an interactive sync.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Transfer code entered on the command line.
    pub code: Option<String>,
    /// Answer to the repository choice.
    pub keep: Option<RepositoryChoice>,
    /// Prompt for a transfer code when the stored ones fail.
    pub ask_code: bool,
}

/// Interactive full sync.
pub async fn run(ws: &Workspace, options: SyncOptions) -> Result<()> {
    ws.load_repository().await?;
    let service = ws.service();

    let mut request = SyncRequest {
        skip_unchanged: false,
        transfer_code: options.code,
        choice: options.keep,
    };
    let mut outcome = service
        .synchronize(request.clone(), UiMode::Gui)
        .await
        .context("Synchronization failed")?;

    if outcome == SyncOutcome::NeedsTransferCode && options.ask_code {
        request.transfer_code = Some(prompt_transfer_code()?);
        outcome = service
            .synchronize(request, UiMode::Gui)
            .await
            .context("Synchronization failed")?;
    }

    print_outcome(&outcome);
    Ok(())
}

/// Background sync: quiet unless something changed or failed.
pub async fn auto(ws: &Workspace) -> Result<()> {
    ws.load_repository().await?;
    let outcome = ws
        .service()
        .auto_synchronize()
        .await
        .context("Background synchronization failed")?;
    tracing::info!(?outcome, "background sync finished");
    Ok(())
}

/// Replace the local copy of a note with the cloud copy.
pub async fn pull(ws: &Workspace, id: &str) -> Result<()> {
    let repo = ws.load_repository().await?;
    let id = resolve_note_id(&repo, id)?;
    let outcome = ws
        .service()
        .pull_note(id, UiMode::Gui)
        .await
        .with_context(|| format!("Failed to pull note {}", short_id(id)))?;
    tracing::debug!(?outcome, "pull finished");
    Ok(())
}

/// Replace the cloud copy of a note with the local copy.
pub async fn push(ws: &Workspace, id: &str) -> Result<()> {
    let repo = ws.load_repository().await?;
    let id = resolve_note_id(&repo, id)?;
    let outcome = ws
        .service()
        .push_note(id, UiMode::Gui)
        .await
        .with_context(|| format!("Failed to push note {}", short_id(id)))?;
    if outcome == NoteMergeOutcome::PushedToCloud {
        tracing::debug!(note = %id, "pushed");
    }
    Ok(())
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Merged {
            stored_local,
            uploaded,
        } => {
            println!(
                "  Local: {}  Cloud: {}",
                if *stored_local { "updated" } else { "unchanged" },
                if *uploaded { "updated" } else { "unchanged" }
            );
        }
        SyncOutcome::NeedsCloudSetup => {
            println!("Run 'notevault connect <dir>' first.");
        }
        SyncOutcome::NeedsTransferCode => {
            println!("Re-run with --code <transfer code> or --ask-code.");
        }
        SyncOutcome::NeedsRepositoryChoice => {
            println!("Re-run with --keep local or --keep cloud.");
        }
        SyncOutcome::Unchanged
        | SyncOutcome::CreatedCloudRepository { .. }
        | SyncOutcome::KeptLocal
        | SyncOutcome::KeptCloud => {}
    }
}

/// Prompt for a transfer code with echo suppression.
fn prompt_transfer_code() -> Result<String> {
    let entered = Zeroizing::new(
        rpassword::prompt_password("Transfer code: ").context("Failed to read transfer code")?,
    );
    entered_transfer_code(&entered)
}

fn entered_transfer_code(entered: &str) -> Result<String> {
    let code = entered.trim();
    if code.is_empty() {
        anyhow::bail!("Transfer code must not be empty");
    }
    Ok(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{connect, init, notes, test_support::workspace};
    use std::path::Path;
    use tempfile::tempdir;

    async fn device(dir: &Path, cloud: &Path) -> Workspace {
        let ws = workspace(dir);
        init::run(&ws).await.unwrap();
        connect::run(&ws, cloud).await.unwrap();
        ws
    }

    #[test]
    fn entered_transfer_code_is_trimmed() {
        assert_eq!(
            entered_transfer_code(" abcd-efgh-ijkm-npqr\n").unwrap(),
            "abcd-efgh-ijkm-npqr"
        );
        assert!(entered_transfer_code("   ").is_err());
    }

    #[tokio::test]
    async fn first_sync_creates_cloud_repository() {
        let dir = tempdir().unwrap();
        let cloud = tempdir().unwrap();
        let ws = device(dir.path(), cloud.path()).await;
        notes::add(&ws, "hello", &[]).await.unwrap();

        run(&ws, SyncOptions::default()).await.unwrap();

        assert!(cloud.path().join(&ws.config().cloud_file).exists());
        let settings = ws.load_settings().await.unwrap();
        assert!(settings.transfer_code.is_some());
        assert!(settings.last_sync_fingerprint.is_some());
    }

    #[tokio::test]
    async fn second_device_joins_with_code() {
        let cloud = tempdir().unwrap();
        let (dir_a, dir_b) = (tempdir().unwrap(), tempdir().unwrap());
        let a = device(dir_a.path(), cloud.path()).await;
        let b = device(dir_b.path(), cloud.path()).await;

        notes::add(&a, "from a", &[]).await.unwrap();
        run(&a, SyncOptions::default()).await.unwrap();
        let code = a.load_settings().await.unwrap().transfer_code.unwrap();

        // Without a code the second device cannot open the cloud repository.
        run(&b, SyncOptions::default()).await.unwrap();
        assert!(b.load_settings().await.unwrap().transfer_code.is_none());

        // Unrelated repositories need a choice.
        let options = SyncOptions {
            code: Some(code.clone()),
            ..SyncOptions::default()
        };
        run(&b, options).await.unwrap();
        assert!(b.load_repository().await.unwrap().notes.is_empty());

        let options = SyncOptions {
            code: Some(code),
            keep: Some(RepositoryChoice::KeepCloud),
            ask_code: false,
        };
        run(&b, options).await.unwrap();
        let repo_b = b.load_repository().await.unwrap();
        assert_eq!(repo_b.id, a.load_repository().await.unwrap().id);
        assert_eq!(repo_b.notes[0].content, "from a");
    }

    #[tokio::test]
    async fn push_and_pull_note() {
        let cloud = tempdir().unwrap();
        let (dir_a, dir_b) = (tempdir().unwrap(), tempdir().unwrap());
        let a = device(dir_a.path(), cloud.path()).await;
        let b = device(dir_b.path(), cloud.path()).await;

        notes::add(&a, "draft", &[]).await.unwrap();
        run(&a, SyncOptions::default()).await.unwrap();
        let code = a.load_settings().await.unwrap().transfer_code;
        run(
            &b,
            SyncOptions {
                code,
                keep: Some(RepositoryChoice::KeepCloud),
                ask_code: false,
            },
        )
        .await
        .unwrap();

        let mut repo_a = a.load_repository().await.unwrap();
        let id = repo_a.notes[0].id;
        let note = repo_a.find_note_mut(id).unwrap();
        note.content = "final".to_string();
        note.touch();
        a.save_repository(&repo_a).await.unwrap();

        push(&a, &id.to_string()).await.unwrap();
        pull(&b, &short_id(id)).await.unwrap();

        let repo_b = b.load_repository().await.unwrap();
        assert_eq!(repo_b.find_note(id).unwrap().content, "final");
    }

    #[tokio::test]
    async fn pull_before_sync_fails() {
        let dir = tempdir().unwrap();
        let cloud = tempdir().unwrap();
        let ws = device(dir.path(), cloud.path()).await;
        notes::add(&ws, "note", &[]).await.unwrap();
        let id = ws.load_repository().await.unwrap().notes[0].id;

        assert!(pull(&ws, &id.to_string()).await.is_err());
    }

    #[tokio::test]
    async fn auto_sync_without_cloud_fails() {
        let dir = tempdir().unwrap();
        let ws = workspace(dir.path());
        init::run(&ws).await.unwrap();

        assert!(auto(&ws).await.is_err());
    }
}
