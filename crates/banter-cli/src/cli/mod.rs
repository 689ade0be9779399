//! CLI command definitions for the `banter` binary.
//!
//! Uses clap derive macros for argument parsing. The CLI follows a verb-noun
//! pattern (e.g., `banter list conversations`, `banter delete memory <id>`).

pub mod chat;
pub mod conversation;
pub mod memory;
pub mod status;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

use banter_core::chat::{Outcome, SkipReason};
use banter_types::error::SessionError;

/// Chat with your assistant from the terminal.
#[derive(Parser)]
#[command(name = "banter", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Chat backend base URL (overrides BANTER_BACKEND_URL and config.toml).
    #[arg(long, global = true, value_name = "URL")]
    pub backend_url: Option<String>,

    /// User identity sent with every request (overrides BANTER_USER_ID).
    #[arg(long, short = 'u', global = true, value_name = "ID")]
    pub user: Option<String>,

    /// Wait for complete replies instead of streaming them.
    #[arg(long, global = true)]
    pub no_stream: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session.
    Chat {
        /// Resume an existing conversation by ID.
        #[arg(long, short = 'c')]
        conversation: Option<String>,
    },

    /// List resources.
    #[command(alias = "ls")]
    List {
        #[command(subcommand)]
        resource: ListResource,
    },

    /// Show a conversation with its messages.
    Show {
        /// Conversation ID to display.
        id: String,
    },

    /// Delete a resource.
    #[command(alias = "rm")]
    Delete {
        #[command(subcommand)]
        resource: DeleteResource,
    },

    /// Rename a conversation.
    Rename {
        /// Conversation ID.
        id: String,

        /// New title.
        title: String,
    },

    /// Show effective configuration and backend reachability.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ListResource {
    /// List conversations, most recently updated first.
    #[command(alias = "convos")]
    Conversations,

    /// List memories the assistant keeps about you.
    Memories,
}

#[derive(Subcommand)]
pub enum DeleteResource {
    /// Delete a conversation and all of its messages.
    Conversation {
        /// Conversation ID.
        id: String,

        /// Skip confirmation prompt.
        #[arg(long, short)]
        force: bool,
    },

    /// Delete a single memory.
    Memory {
        /// Memory ID.
        id: String,

        /// Skip confirmation prompt.
        #[arg(long, short)]
        force: bool,
    },
}

/// Short explanation of why an operation did nothing.
pub fn describe_skip(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NoIdentity => {
            "No user identity configured. Pass --user or set BANTER_USER_ID."
        }
        SkipReason::Busy => "Still waiting on the previous reply.",
        SkipReason::NoConversation => "No conversation is open.",
        SkipReason::NoUserTurn => "There is no message to regenerate a reply for.",
        SkipReason::EmptyInput => "Nothing to send.",
        SkipReason::Unknown => "No such item.",
    }
}

/// Turn a one-shot command outcome into a CLI result.
///
/// Skips become errors, since a one-shot command that did nothing failed.
pub fn expect_done(outcome: Result<Outcome, SessionError>, what: &str) -> anyhow::Result<()> {
    match outcome {
        Ok(Outcome::Done) => Ok(()),
        Ok(Outcome::Superseded) => Err(anyhow!("{what} was interrupted")),
        Ok(Outcome::Skipped(SkipReason::Unknown)) => Err(anyhow!("{what}: not found")),
        Ok(Outcome::Skipped(reason)) => Err(anyhow!("{}", describe_skip(reason))),
        Err(e) => Err(anyhow!("{}", e.user_message())),
    }
}
