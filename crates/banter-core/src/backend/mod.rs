//! Backend client abstraction for Banter.
//!
//! This module defines the `BackendClient` trait that the infrastructure
//! layer implements over HTTP, plus the chat request/reply payloads.

pub mod client;

pub use client::{BackendClient, ChatReply, ChatRequest, ChunkStream};
