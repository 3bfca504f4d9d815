//! Note editing commands.

use anyhow::Result;
use vault_types::Note;

use super::{resolve_note_id, short_id, Workspace};

/// Add a note at the top of the list.
pub async fn add(ws: &Workspace, text: &str, tags: &[String]) -> Result<()> {
    let mut repo = ws.load_repository().await?;

    let mut note = Note::with_content(text);
    note.tags = tags.to_vec();
    let id = note.id;
    repo.add_note(note);
    ws.save_repository(&repo).await?;

    println!("Added note {}", short_id(id));
    Ok(())
}

/// Print all notes in display order.
pub async fn list(ws: &Workspace) -> Result<()> {
    let repo = ws.load_repository().await?;

    if repo.notes.is_empty() {
        println!("No notes.");
        return Ok(());
    }

    for note in &repo.notes {
        let text = if note.safe_id.is_some() {
            "[locked]".to_string()
        } else {
            preview(&note.content)
        };
        let mut line = format!("{}  {}", short_id(note.id), text);
        if !note.tags.is_empty() {
            line.push_str(&format!("  #{}", note.tags.join(" #")));
        }
        if note.in_recycling_bin {
            line.push_str("  (recycled)");
        }
        println!("{}", line);
    }
    Ok(())
}

/// Delete a note, leaving a tombstone for the next sync.
pub async fn delete(ws: &Workspace, id: &str) -> Result<()> {
    let mut repo = ws.load_repository().await?;
    let id = resolve_note_id(&repo, id)?;

    if !repo.delete_note(id) {
        anyhow::bail!("Note {} not found", short_id(id));
    }
    ws.save_repository(&repo).await?;

    println!("Deleted note {}", short_id(id));
    Ok(())
}

/// First line of the content, at most 60 characters.
fn preview(content: &str) -> String {
    let line = content.lines().next().unwrap_or_default();
    let mut preview: String = line.chars().take(60).collect();
    if line.chars().count() > 60 {
        preview.push_str("...");
    }
    preview
}
