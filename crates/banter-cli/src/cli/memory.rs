//! Memory CLI commands: list and delete.
//!
//! Memories are extracted by the backend from completed turns; the client
//! can only browse and remove them.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use banter_types::memory::{MemoryEntry, MemoryId};

use crate::state::AppState;

use super::chat::renderer::preview;
use super::expect_done;

/// List every memory entry.
///
/// # Examples
///
/// ```bash
/// banter list memories
/// banter list memories --json
/// ```
pub async fn list_memories(state: &AppState, json: bool) -> Result<()> {
    expect_done(state.session.refresh_memories().await, "Listing memories")?;
    let memories = state.session.memories();

    if json {
        println!("{}", serde_json::to_string_pretty(&memories)?);
        return Ok(());
    }

    if memories.is_empty() {
        println!();
        println!(
            "  {} No memories yet. Memories are extracted from your conversations.",
            style("i").blue().bold(),
        );
        println!();
        return Ok(());
    }

    println!();
    println!("{}", memory_table(&memories));
    println!();
    println!(
        "  {} memor{}",
        style(memories.len()).bold(),
        if memories.len() == 1 { "y" } else { "ies" }
    );
    println!();

    Ok(())
}

pub fn memory_table(memories: &[MemoryEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Memory").fg(Color::White),
        Cell::new("Date").fg(Color::White),
    ]);

    for mem in memories {
        table.add_row(vec![
            Cell::new(mem.id.to_string()).fg(Color::DarkGrey),
            Cell::new(preview(&mem.content, 80)).fg(Color::White),
            Cell::new(mem.created_at.format("%Y-%m-%d").to_string()).fg(Color::DarkGrey),
        ]);
    }
    table
}

/// Delete a single memory after confirmation.
pub async fn delete_memory(state: &AppState, id: &str, force: bool, json: bool) -> Result<()> {
    let id = MemoryId::new(id);

    expect_done(state.session.refresh_memories().await, "Listing memories")?;
    let Some(memory) = state.session.memories().into_iter().find(|m| m.id == id) else {
        anyhow::bail!("Memory '{id}' not found");
    };

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Forget \"{}\"?",
                style(preview(&memory.content, 60)).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    expect_done(state.session.delete_memory(&id).await, "Deleting memory")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "deleted": id }))?
        );
    } else {
        println!();
        println!("  {} Memory forgotten.", style("✓").green().bold());
        println!();
    }
    Ok(())
}
