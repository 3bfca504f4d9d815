//! Safe commands: password-protected note content.

use anyhow::{Context, Result};
use vault_core::{create_safe, decrypt_note, encrypt_note, open_safe, open_safes};
use vault_types::{Repository, SafeId};
use zeroize::Zeroizing;

use super::{resolve_note_id, short_id, Workspace};

/// Create a safe sealed under a password.
pub async fn create(ws: &Workspace, password: Option<&str>) -> Result<()> {
    let mut repo = ws.load_repository().await?;
    let password = read_password(password, "Password for the new safe: ")?;

    let options = ws.config().safe_options();
    let mut safe = tokio::task::spawn_blocking(move || create_safe(&password, &options))
        .await
        .context("Key derivation task failed")?
        .context("Failed to create safe")?;
    safe.close();

    let id = safe.id;
    repo.safes.push(safe);
    ws.save_repository(&repo).await?;

    println!("Created safe {}", short_id(id));
    Ok(())
}

/// Move a note's content into a safe.
pub async fn lock(ws: &Workspace, note: &str, safe: &str, password: Option<&str>) -> Result<()> {
    let mut repo = ws.load_repository().await?;
    let note_id = resolve_note_id(&repo, note)?;
    let safe_id = resolve_safe_id(&repo, safe)?;

    if repo
        .find_note(note_id)
        .is_some_and(|n| n.safe_id.is_some())
    {
        anyhow::bail!("Note {} is already locked", short_id(note_id));
    }

    let password = read_password(password, "Safe password: ")?;
    // Clones are closed; open the copy and leave the stored safe sealed.
    let mut safe = repo
        .find_safe(safe_id)
        .cloned()
        .context("Safe disappeared while loading")?;
    let safe = tokio::task::spawn_blocking(move || open_safe(&mut safe, &password).map(|()| safe))
        .await
        .context("Key derivation task failed")?
        .context("Wrong password")?;

    let options = ws.config().note_options();
    let note = repo
        .find_note_mut(note_id)
        .context("Note disappeared while loading")?;
    encrypt_note(note, &safe, &options).context("Failed to encrypt note")?;
    note.touch();

    ws.save_repository(&repo).await?;

    println!(
        "Locked note {} in safe {}",
        short_id(note_id),
        short_id(safe_id)
    );
    Ok(())
}

/// Print a note, unlocking its safe when needed.
pub async fn show(ws: &Workspace, note: &str, password: Option<&str>) -> Result<()> {
    let mut repo = ws.load_repository().await?;
    let note_id = resolve_note_id(&repo, note)?;
    let locked = repo
        .find_note(note_id)
        .context("Note not found")?
        .safe_id
        .is_some();

    if locked {
        let password = read_password(password, "Safe password: ")?;
        let (opened, count) = tokio::task::spawn_blocking(move || {
            let count = open_safes(&mut repo, &password);
            (repo, count)
        })
        .await
        .context("Key derivation task failed")?;
        tracing::debug!(count, "opened safes");
        repo = opened;
    }

    let note = repo.find_note(note_id).context("Note not found")?;
    let content = decrypt_note(note, &repo).context("Failed to unlock note")?;
    println!("{}", content);
    Ok(())
}

/// Resolve a full safe id or a unique prefix of one.
fn resolve_safe_id(repo: &Repository, input: &str) -> Result<SafeId> {
    if let Ok(id) = input.parse::<SafeId>() {
        if repo.find_safe(id).is_some() {
            return Ok(id);
        }
    }
    let prefix = input.to_ascii_lowercase();
    let mut matches = repo
        .safes
        .iter()
        .map(|s| s.id)
        .filter(|id| id.to_string().starts_with(&prefix));

    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (None, _) => anyhow::bail!("No safe matches '{}'", input),
        (Some(_), Some(_)) => anyhow::bail!("'{}' matches several safes", input),
    }
}

/// Use the password given on the command line, or prompt for one with
/// echo suppression.
fn read_password(given: Option<&str>, prompt: &str) -> Result<Zeroizing<String>> {
    match given {
        Some(password) => Ok(Zeroizing::new(password.to_string())),
        None => {
            let entered = Zeroizing::new(
                rpassword::prompt_password(prompt).context("Failed to read password")?,
            );
            validate_password(&entered)
        }
    }
}

fn validate_password(entered: &str) -> Result<Zeroizing<String>> {
    let trimmed = Zeroizing::new(entered.trim().to_string());
    if trimmed.len() < 8 {
        anyhow::bail!("Password must be at least 8 characters");
    }
    Ok(trimmed)
}
