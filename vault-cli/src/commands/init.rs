//! Initialize a local repository.

use anyhow::Result;
use vault_types::Repository;

use super::{short_id, Workspace};

/// Create an empty repository in the data directory.
pub async fn run(ws: &Workspace) -> Result<()> {
    if ws.is_initialized() {
        anyhow::bail!(
            "Repository already exists at {}",
            ws.repository_path().display()
        );
    }

    let repo = Repository::new();
    ws.save_repository(&repo).await?;

    println!("Repository initialized!");
    println!("  ID: {}", short_id(repo.id));
    println!("  File: {}", ws.repository_path().display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::workspace;
    use tempfile::tempdir;

    #[tokio::test]
    async fn init_creates_repository() {
        let dir = tempdir().unwrap();
        let ws = workspace(dir.path());

        run(&ws).await.unwrap();

        assert!(ws.is_initialized());
        let repo = ws.load_repository().await.unwrap();
        assert!(repo.notes.is_empty());
    }

    #[tokio::test]
    async fn init_twice_fails() {
        let dir = tempdir().unwrap();
        let ws = workspace(dir.path());

        run(&ws).await.unwrap();
        let first = ws.load_repository().await.unwrap().id;

        assert!(run(&ws).await.is_err());
        assert_eq!(ws.load_repository().await.unwrap().id, first);
    }
}
