//! Banter command-line chat client.
//!
//! Binary name: `banter`
//!
//! Parses CLI arguments, loads configuration, wires the session controller
//! to the HTTP backend, then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use banter_observe::tracing_setup::{filter_for_verbosity, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, DeleteResource, ListResource};
use state::{AppState, ConfigOverrides};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(filter_for_verbosity(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "banter", &mut std::io::stdout());
        return Ok(());
    }

    let overrides = ConfigOverrides {
        backend_url: cli.backend_url.clone(),
        user_id: cli.user.clone(),
        no_stream: cli.no_stream,
    };
    let state = AppState::init(&overrides).await?;

    let result = match cli.command {
        Commands::Chat { conversation } => {
            cli::chat::loop_runner::run_chat_loop(&state, conversation).await
        }

        Commands::List { resource } => match resource {
            ListResource::Conversations => {
                cli::conversation::list_conversations(&state, cli.json).await
            }
            ListResource::Memories => cli::memory::list_memories(&state, cli.json).await,
        },

        Commands::Show { id } => cli::conversation::show_conversation(&state, &id, cli.json).await,

        Commands::Delete { resource } => match resource {
            DeleteResource::Conversation { id, force } => {
                cli::conversation::delete_conversation(&state, &id, force, cli.json).await
            }
            DeleteResource::Memory { id, force } => {
                cli::memory::delete_memory(&state, &id, force, cli.json).await
            }
        },

        Commands::Rename { id, title } => {
            cli::conversation::rename_conversation(&state, &id, &title, cli.json).await
        }

        Commands::Status => cli::status::status(&state, cli.json).await,

        Commands::Completions { .. } => unreachable!("handled above"),
    };

    // Let in-flight refreshes settle and cancel deferred ones before exit.
    state.session.shutdown().await;
    result
}
