//! Terminal output for the chat loop.
//!
//! Streamed chunks are printed raw as they arrive; transcripts and notices
//! are styled with `console`.

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use banter_types::chat::{Message, MessageRole};

/// Label printed in front of assistant replies.
const ASSISTANT_LABEL: &str = "Assistant";

/// Terminal renderer for replies, transcripts, and notices.
#[derive(Debug, Default)]
pub struct ChatRenderer;

impl ChatRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Spinner shown until the first chunk of a reply arrives.
    pub fn thinking_spinner(&self) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let template = ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(template);
        spinner.set_message("thinking...");
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }

    pub fn print_reply_prefix(&self) {
        print!("\n  {} ", style(ASSISTANT_LABEL).cyan().bold());
        let _ = std::io::stdout().flush();
    }

    /// Print a single streaming chunk (raw, no formatting).
    pub fn print_streaming_token(&self, token: &str) {
        print!("{token}");
        let _ = std::io::stdout().flush();
    }

    /// Print the footer after a reply: elapsed time and reply size.
    pub fn print_stats_footer(&self, elapsed: Duration, chars: usize) {
        let footer = format!(
            "\n  {} {} chars {} {:.1}s",
            style("|").dim(),
            style(chars).dim(),
            style("\u{00b7}").dim(),
            style(elapsed.as_secs_f64()).dim(),
        );
        println!("{footer}");
    }

    /// Print a transcript. With `limit`, only the last `limit` messages are
    /// shown and long ones are shortened.
    pub fn print_transcript(&self, messages: &[Message], limit: Option<usize>) {
        if messages.is_empty() {
            println!("  {}", style("No messages yet.").dim());
            println!();
            return;
        }

        let skip = limit.map_or(0, |n| messages.len().saturating_sub(n));
        for msg in &messages[skip..] {
            let label = match msg.role {
                MessageRole::User => style("You").green().bold(),
                MessageRole::Assistant => style(ASSISTANT_LABEL).cyan().bold(),
                MessageRole::System => style("System").dim().bold(),
            };
            let body = match limit {
                Some(_) => preview(&msg.content, 100),
                None => msg.content.clone(),
            };
            println!("  {label} {body}");
            if !msg.attachments.is_empty() {
                println!(
                    "    {}",
                    style(format!("[{} image attachment(s)]", msg.attachments.len())).dim()
                );
            }
            println!();
        }
    }

    pub fn print_notice(&self, text: &str) {
        println!("\n  {} {}\n", style("*").cyan().bold(), text);
    }

    pub fn print_warning(&self, text: &str) {
        println!("\n  {} {}\n", style("!").yellow().bold(), text);
    }

    pub fn print_error(&self, text: &str) {
        eprintln!("\n  {} {}", style("!").red().bold(), text);
    }
}

/// Shorten `text` to at most `max` characters, on a character boundary.
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let kept: String = flat.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Human-friendly age of `then` relative to `now`.
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        86_400..=604_799 => format!("{}d ago", secs / 86_400),
        _ => then.format("%Y-%m-%d").to_string(),
    }
}
