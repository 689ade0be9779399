//! Main chat loop orchestration.
//!
//! Reads lines, dispatches slash commands, and drives turns through the
//! session controller while rendering streamed chunks from its event bus.

use std::future::Future;
use std::time::Instant;

use console::style;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use banter_core::attachment::sniff::is_image_mime;
use banter_core::attachment::{AttachmentSource, PendingAttachments};
use banter_core::chat::{Outcome, SkipReason};
use banter_infra::filesystem::FileSource;
use banter_types::chat::ConversationId;
use banter_types::error::SessionError;
use banter_types::event::SessionEvent;
use banter_types::memory::MemoryId;

use crate::cli::describe_skip;
use crate::cli::memory::memory_table;
use crate::state::{AppState, ConcreteSession};

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{ChatRenderer, format_age, preview};

/// What the loop does after a slash command.
enum Flow {
    Continue,
    Exit,
}

/// Run the interactive chat loop, optionally resuming a conversation.
pub async fn run_chat_loop(state: &AppState, resume: Option<String>) -> anyhow::Result<()> {
    let session = &state.session;
    let Some(identity) = session.identity() else {
        anyhow::bail!(describe_skip(SkipReason::NoIdentity));
    };
    let renderer = ChatRenderer::new();

    if let Err(e) = session.refresh_conversations().await {
        renderer.print_warning(&e.user_message());
    }
    if let Err(e) = session.refresh_memories().await {
        warn!(error = %e, "Initial memory refresh failed");
    }

    print_welcome_banner(
        identity.as_str(),
        &state.config.backend_url,
        state.config.streaming,
        session.memories().len(),
    );

    if let Some(id) = resume {
        switch_to(session, &renderer, ConversationId::new(id)).await;
    }

    let (mut chat_input, _writer) = ChatInput::new(prompt(&PendingAttachments::new()))
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;
    let mut pending = PendingAttachments::new();

    loop {
        chat_input.update_prompt(&prompt(&pending));
        match chat_input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }

                if let Some(cmd) = commands::parse(&text) {
                    match handle_command(state, &renderer, &mut chat_input, &mut pending, cmd).await
                    {
                        Flow::Continue => continue,
                        Flow::Exit => break,
                    }
                }

                let attachments = pending.take();
                let result = drive_turn(
                    session,
                    &renderer,
                    session.send_message(&text, attachments.clone()),
                )
                .await;

                // Only a skipped send leaves the attachments unused.
                if matches!(result, Ok(Outcome::Skipped(_))) {
                    for attachment in attachments {
                        pending.push(attachment);
                    }
                }
                report_turn(&renderer, result);
            }
        }
    }

    println!("\n  {}", style("Session ended.").dim());
    session.shutdown().await;
    Ok(())
}

async fn handle_command(
    state: &AppState,
    renderer: &ChatRenderer,
    chat_input: &mut ChatInput,
    pending: &mut PendingAttachments,
    cmd: ChatCommand,
) -> Flow {
    let session = &state.session;
    match cmd {
        ChatCommand::Help => commands::print_help(),
        ChatCommand::Clear => chat_input.clear(),
        ChatCommand::Exit => return Flow::Exit,
        ChatCommand::New => {
            if succeeded(renderer, session.new_chat().await) {
                renderer.print_notice("Started a new conversation.");
            }
        }
        ChatCommand::List => {
            if let Err(e) = session.refresh_conversations().await {
                renderer.print_warning(&e.user_message());
            }
            print_conversation_list(session);
        }
        ChatCommand::Switch(id) => switch_to(session, renderer, ConversationId::new(id)).await,
        ChatCommand::Delete(id) => {
            let id = ConversationId::new(id);
            match session.delete_conversation(&id).await {
                Ok(Outcome::Skipped(SkipReason::Unknown)) => {
                    renderer.print_warning(&format!("No conversation '{id}'. Try /list."));
                }
                result => {
                    if succeeded(renderer, result) {
                        renderer.print_notice(&format!("Deleted conversation {id}."));
                    }
                }
            }
        }
        ChatCommand::Rename(title) => match session.current_conversation() {
            Some(id) => {
                if succeeded(renderer, session.rename_conversation(&id, &title).await) {
                    renderer.print_notice(&format!("Renamed to '{}'.", title.trim()));
                }
            }
            None => renderer.print_warning(describe_skip(SkipReason::NoConversation)),
        },
        ChatCommand::Regenerate => {
            let result = drive_turn(session, renderer, session.regenerate()).await;
            report_turn(renderer, result);
        }
        ChatCommand::Attach(paths) => attach(state, renderer, pending, paths).await,
        ChatCommand::Detach(None) => {
            let count = pending.len();
            pending.clear();
            renderer.print_notice(&format!("Dropped {count} attachment(s)."));
        }
        ChatCommand::Detach(Some(n)) => match pending.remove(n - 1) {
            Some(removed) => renderer.print_notice(&format!(
                "Dropped {}.",
                removed.name.as_deref().unwrap_or("attachment")
            )),
            None => renderer.print_warning(&format!("No attachment #{n}.")),
        },
        ChatCommand::Memories => {
            if let Err(e) = session.refresh_memories().await {
                renderer.print_warning(&e.user_message());
            }
            let memories = session.memories();
            if memories.is_empty() {
                renderer.print_notice("No memories yet.");
            } else {
                println!();
                println!("{}", memory_table(&memories));
                println!();
            }
        }
        ChatCommand::Forget(id) => {
            let id = MemoryId::new(id);
            match session.delete_memory(&id).await {
                Ok(Outcome::Skipped(SkipReason::Unknown)) => {
                    renderer.print_warning(&format!("No memory '{id}'. Try /memories."));
                }
                result => {
                    if succeeded(renderer, result) {
                        renderer.print_notice("Memory forgotten.");
                    }
                }
            }
        }
        ChatCommand::History => {
            println!();
            renderer.print_transcript(&session.transcript(), Some(20));
        }
        ChatCommand::Unknown(what) => {
            println!(
                "\n  {} Unknown command: {}. Type /help for available commands.\n",
                style("?").yellow().bold(),
                style(what).dim()
            );
        }
    }
    Flow::Continue
}

/// Drive a send or regenerate to completion while printing its chunks.
///
/// Subscribes before the turn is first polled, so no chunk published by
/// this turn is missed unless the renderer lags the bus.
async fn drive_turn<F>(
    session: &ConcreteSession,
    renderer: &ChatRenderer,
    turn: F,
) -> Result<Outcome, SessionError>
where
    F: Future<Output = Result<Outcome, SessionError>>,
{
    let mut events = session.subscribe();
    let spinner = renderer.thinking_spinner();
    let started = Instant::now();
    let mut printed = 0usize;
    let mut streaming = false;
    let mut lagged = false;

    let mut render = |event: SessionEvent| {
        if let SessionEvent::ChunkApplied { text, .. } = event {
            if !streaming {
                spinner.finish_and_clear();
                renderer.print_reply_prefix();
                streaming = true;
            }
            renderer.print_streaming_token(&text);
            printed += text.chars().count();
        }
    };

    tokio::pin!(turn);
    let result = loop {
        tokio::select! {
            result = &mut turn => break result,
            event = events.recv() => match event {
                Ok(event) => render(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Chat renderer fell behind the event bus");
                    lagged = true;
                }
                Err(RecvError::Closed) => break (&mut turn).await,
            },
        }
    };
    // Chunks published right before the turn returned.
    while let Ok(event) = events.try_recv() {
        render(event);
    }
    spinner.finish_and_clear();

    if streaming {
        println!();
    }
    if lagged && matches!(result, Ok(Outcome::Done)) {
        if let Some(last) = session.transcript().last() {
            println!("\n  {}", style("(reply re-printed in full)").dim());
            println!("  {}", last.content);
            printed = last.content.chars().count();
        }
    }
    if matches!(result, Ok(Outcome::Done)) {
        renderer.print_stats_footer(started.elapsed(), printed);
        println!();
    }
    debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Turn finished");
    result
}

fn report_turn(renderer: &ChatRenderer, result: Result<Outcome, SessionError>) {
    match result {
        Ok(Outcome::Done) => {}
        Ok(Outcome::Superseded) => renderer.print_warning("Reply discarded."),
        Ok(Outcome::Skipped(reason)) => renderer.print_warning(describe_skip(reason)),
        Err(e) => {
            renderer.print_error(&e.user_message());
            if let Some(hint) = retry_hint(&e) {
                eprintln!("  {}", style(hint).dim());
            }
            println!();
        }
    }
}

/// Follow-up advice after a failed turn. Nothing was appended when the
/// conversation could not be created, so there is nothing to regenerate.
fn retry_hint(error: &SessionError) -> Option<&'static str> {
    match error {
        SessionError::ConversationCreate(_) => None,
        _ => Some("Your message was kept. Use /regen to try again."),
    }
}

/// Print the outcome of a non-turn action; true when it took effect.
fn succeeded(renderer: &ChatRenderer, result: Result<Outcome, SessionError>) -> bool {
    match result {
        Ok(Outcome::Done) => true,
        Ok(Outcome::Superseded) => {
            renderer.print_warning("Interrupted by a newer action.");
            false
        }
        Ok(Outcome::Skipped(reason)) => {
            renderer.print_warning(describe_skip(reason));
            false
        }
        Err(e) => {
            renderer.print_error(&e.user_message());
            println!();
            false
        }
    }
}

async fn switch_to(session: &ConcreteSession, renderer: &ChatRenderer, id: ConversationId) {
    if !succeeded(renderer, session.select_conversation(&id).await) {
        return;
    }
    let title = session
        .conversations()
        .into_iter()
        .find(|c| c.id == id)
        .map(|c| c.title)
        .unwrap_or_else(|| id.to_string());
    renderer.print_notice(&format!("Opened '{}'.", style(title).cyan()));
    renderer.print_transcript(&session.transcript(), Some(10));
}

async fn attach(
    state: &AppState,
    renderer: &ChatRenderer,
    pending: &mut PendingAttachments,
    paths: Vec<String>,
) {
    let (sources, skipped): (Vec<FileSource>, Vec<FileSource>) = paths
        .into_iter()
        .map(FileSource::new)
        .partition(|source| is_image_mime(source.mime_type()));

    for source in &skipped {
        renderer.print_warning(&format!(
            "Skipped {}: only images can be attached.",
            source.path().display()
        ));
    }
    if sources.is_empty() {
        return;
    }

    let before = pending.len();
    let rejected = state.encoder.encode_into(&sources, pending).await;
    for e in &rejected {
        renderer.print_warning(&e.to_string());
    }

    let added = pending.len() - before;
    if added > 0 {
        let names: Vec<&str> = pending
            .iter()
            .skip(before)
            .map(|a| a.name.as_deref().unwrap_or("image"))
            .collect();
        renderer.print_notice(&format!(
            "Attached {} ({} staged for your next message).",
            names.join(", "),
            pending.len()
        ));
    }
}

fn print_conversation_list(session: &ConcreteSession) {
    let conversations = session.conversations();
    let current = session.current_conversation();
    println!();
    if conversations.is_empty() {
        println!("  {}", style("No conversations yet.").dim());
    }
    let now = chrono::Utc::now();
    for conv in &conversations {
        let marker = if current.as_ref() == Some(&conv.id) {
            style(">").green().bold()
        } else {
            style(" ")
        };
        println!(
            "  {marker} {}  {}  {}",
            style(conv.id.as_str()).dim(),
            preview(&conv.title, 50),
            style(format_age(conv.updated_at, now)).dim()
        );
    }
    println!();
}

fn prompt(pending: &PendingAttachments) -> String {
    if pending.is_empty() {
        format!("  {} ", style("You >").green().bold())
    } else {
        format!(
            "  {} {} ",
            style(format!("[+{} img]", pending.len())).yellow(),
            style("You >").green().bold()
        )
    }
}
