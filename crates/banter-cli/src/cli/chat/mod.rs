//! Interactive terminal chat.
//!
//! Streams replies as they arrive, stages image attachments, and exposes
//! conversation and memory management as slash commands. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
