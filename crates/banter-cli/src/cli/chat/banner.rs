//! Welcome banner display for chat sessions.

use console::style;

/// Print the welcome banner at the start of a chat session.
pub fn print_welcome_banner(user: &str, backend_url: &str, streaming: bool, memories: usize) {
    println!();
    println!("  * {}", style("Banter").cyan().bold());
    println!();
    println!("  {}     {}", style("User:").bold(), style(user).dim());
    println!("  {}  {}", style("Backend:").bold(), style(backend_url).dim());
    println!(
        "  {}  {}",
        style("Replies:").bold(),
        style(if streaming { "streaming" } else { "buffered" }).dim()
    );
    if memories > 0 {
        println!(
            "  {} {}",
            style("Memories:").bold(),
            style(format!("{memories} remembered")).dim()
        );
    }
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
