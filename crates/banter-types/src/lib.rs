//! Shared domain types for Banter.
//!
//! This crate contains the domain types exchanged between the session core,
//! the backend client, and the CLI: conversations, messages, attachments,
//! memories, caller identity, session events, configuration, and errors.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod identity;
pub mod memory;
