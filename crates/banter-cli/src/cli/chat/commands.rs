//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and provide in-chat controls for conversations,
//! attachments, and memories.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Exit the chat session.
    Exit,
    /// Start a new conversation.
    New,
    /// List conversations.
    List,
    /// Open another conversation by ID.
    Switch(String),
    /// Delete a conversation by ID.
    Delete(String),
    /// Rename the current conversation.
    Rename(String),
    /// Answer the last message again.
    Regenerate,
    /// Stage image files for the next message.
    Attach(Vec<String>),
    /// Drop a staged attachment (1-based), or all of them.
    Detach(Option<usize>),
    /// List memories.
    Memories,
    /// Delete a memory by ID.
    Forget(String),
    /// Show the current transcript.
    History,
    /// Unknown command or bad arguments.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
        None => (trimmed.to_lowercase(), ""),
    };

    let required = |build: fn(String) -> ChatCommand, usage: &str| {
        if arg.is_empty() {
            ChatCommand::Unknown(format!("usage: {usage}"))
        } else {
            build(arg.to_string())
        }
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/new" => ChatCommand::New,
        "/list" | "/ls" => ChatCommand::List,
        "/switch" | "/open" => required(ChatCommand::Switch, "/switch <id>"),
        "/delete" | "/rm" => required(ChatCommand::Delete, "/delete <id>"),
        "/rename" => required(ChatCommand::Rename, "/rename <title>"),
        "/regen" | "/retry" => ChatCommand::Regenerate,
        "/attach" | "/img" => {
            let paths: Vec<String> = arg.split_whitespace().map(str::to_string).collect();
            if paths.is_empty() {
                ChatCommand::Unknown("usage: /attach <path>...".to_string())
            } else {
                ChatCommand::Attach(paths)
            }
        }
        "/detach" => {
            if arg.is_empty() {
                ChatCommand::Detach(None)
            } else {
                match arg.parse::<usize>() {
                    Ok(n) if n > 0 => ChatCommand::Detach(Some(n)),
                    _ => ChatCommand::Unknown("usage: /detach [number]".to_string()),
                }
            }
        }
        "/memories" | "/mem" => ChatCommand::Memories,
        "/forget" => required(ChatCommand::Forget, "/forget <memory-id>"),
        "/history" => ChatCommand::History,
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Print the help text listing all available commands.
pub fn print_help() {
    let rows = [
        ("/help", "Show this help message"),
        ("/new", "Start a new conversation"),
        ("/list", "List conversations"),
        ("/switch <id>", "Open another conversation"),
        ("/delete <id>", "Delete a conversation"),
        ("/rename <title>", "Rename the current conversation"),
        ("/regen", "Answer your last message again"),
        ("/attach <path>...", "Attach images to your next message"),
        ("/detach [n]", "Drop one or all staged attachments"),
        ("/memories", "List what the assistant remembers"),
        ("/forget <id>", "Delete a memory"),
        ("/history", "Show this conversation"),
        ("/clear", "Clear the screen"),
        ("/exit", "End the chat session"),
    ];

    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    for (cmd, description) in rows {
        println!("  {} {}", style(format!("{cmd:<20}")).cyan(), description);
    }
    println!();
    println!("  {}", style("Ctrl+D to exit").dim());
    println!();
}
