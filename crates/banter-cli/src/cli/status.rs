//! Status command: effective configuration and backend reachability.

use anyhow::Result;
use console::style;

use banter_core::chat::Outcome;

use crate::state::AppState;

use super::describe_skip;

/// Print where the client points and whether the backend answers.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let identity = state.session.identity();
    let probe = state.session.refresh_conversations().await;
    let (reachable, detail) = match &probe {
        Ok(Outcome::Done) => (true, format!("{} conversations", state.session.conversations().len())),
        Ok(Outcome::Skipped(reason)) => (false, describe_skip(*reason).to_string()),
        Ok(Outcome::Superseded) => (false, "identity changed".to_string()),
        Err(e) => (false, e.user_message()),
    };

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "backend_url": state.config.backend_url,
            "user": identity.as_ref().map(|i| i.as_str()),
            "streaming": state.config.streaming,
            "reachable": reachable,
            "detail": detail,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Banter v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("  {}", style("── Client ──").dim());
    println!("  Backend:   {}", style(&state.config.backend_url).cyan());
    match &identity {
        Some(id) => println!("  User:      {}", style(id).bold()),
        None => println!("  User:      {}", style("not set").yellow()),
    }
    println!(
        "  Replies:   {}",
        if state.config.streaming { "streaming" } else { "buffered" }
    );
    println!("  Data dir:  {}", style(state.data_dir.display()).dim());
    println!();
    println!("  {}", style("── Backend ──").dim());
    if reachable {
        println!("  {} reachable ({detail})", style("✓").green());
    } else {
        println!("  {} {detail}", style("✗").red());
    }
    println!();
    Ok(())
}
