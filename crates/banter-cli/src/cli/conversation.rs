//! Conversation CLI commands: list, show, rename, delete.

use anyhow::{Context, Result};
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use banter_types::chat::ConversationId;

use crate::state::AppState;

use super::chat::renderer::{ChatRenderer, format_age};
use super::expect_done;

/// List conversations, most recently updated first.
///
/// # Examples
///
/// ```bash
/// banter list conversations
/// banter ls convos --json
/// ```
pub async fn list_conversations(state: &AppState, json: bool) -> Result<()> {
    expect_done(
        state.session.refresh_conversations().await,
        "Listing conversations",
    )?;
    let conversations = state.session.conversations();

    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }

    if conversations.is_empty() {
        println!();
        println!(
            "  {} No conversations yet. Start one with: {}",
            style("i").blue().bold(),
            style("banter chat").yellow()
        );
        println!();
        return Ok(());
    }

    let now = Utc::now();
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
        Cell::new("Created").fg(Color::White),
    ]);

    for conv in &conversations {
        table.add_row(vec![
            Cell::new(conv.id.as_str()).fg(Color::DarkGrey),
            Cell::new(&conv.title).fg(Color::Cyan),
            Cell::new(format_age(conv.updated_at, now)).fg(Color::White),
            Cell::new(conv.created_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} conversation{}",
        style(conversations.len()).bold(),
        if conversations.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Show one conversation with its full transcript.
pub async fn show_conversation(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id = ConversationId::new(id);
    expect_done(
        state.session.select_conversation(&id).await,
        "Loading conversation",
    )
    .with_context(|| format!("Could not load conversation '{id}'"))?;

    let conversation = state
        .session
        .conversations()
        .into_iter()
        .find(|c| c.id == id)
        .with_context(|| format!("Conversation '{id}' not found"))?;
    let transcript = state.session.transcript();

    if json {
        let value = serde_json::json!({
            "id": conversation.id,
            "title": conversation.title,
            "created_at": conversation.created_at,
            "updated_at": conversation.updated_at,
            "messages": transcript,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!();
    println!("  {}", style(&conversation.title).cyan().bold());
    println!(
        "  {}",
        style(format!(
            "{} \u{00b7} {} message{} \u{00b7} updated {}",
            conversation.id,
            transcript.len(),
            if transcript.len() == 1 { "" } else { "s" },
            format_age(conversation.updated_at, Utc::now()),
        ))
        .dim()
    );
    println!();
    ChatRenderer::new().print_transcript(&transcript, None);
    Ok(())
}

/// Rename a conversation.
pub async fn rename_conversation(state: &AppState, id: &str, title: &str, json: bool) -> Result<()> {
    let id = ConversationId::new(id);
    expect_done(
        state.session.rename_conversation(&id, title).await,
        "Renaming conversation",
    )?;

    let renamed = state.session.conversations().into_iter().find(|c| c.id == id);
    if json {
        println!("{}", serde_json::to_string_pretty(&renamed)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Renamed to '{}'",
        style("✓").green().bold(),
        style(title.trim()).cyan()
    );
    println!();
    Ok(())
}

/// Delete a conversation after confirmation.
pub async fn delete_conversation(state: &AppState, id: &str, force: bool, json: bool) -> Result<()> {
    let id = ConversationId::new(id);

    // Deletion only considers ids the session knows about.
    expect_done(
        state.session.refresh_conversations().await,
        "Listing conversations",
    )?;
    let Some(conversation) = state.session.conversations().into_iter().find(|c| c.id == id) else {
        anyhow::bail!("Conversation '{id}' not found");
    };

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete conversation '{}' and all of its messages? This cannot be undone.",
                style(&conversation.title).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    expect_done(
        state.session.delete_conversation(&id).await,
        "Deleting conversation",
    )?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "deleted": id }))?
        );
    } else {
        println!();
        println!(
            "  {} Deleted '{}'",
            style("✓").green().bold(),
            style(&conversation.title).cyan()
        );
        println!();
    }
    Ok(())
}
