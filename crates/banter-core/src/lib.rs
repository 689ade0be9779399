//! Conversation session core for Banter.
//!
//! This crate defines the `BackendClient` port that the infrastructure layer
//! implements, and the session logic built on top of it: the conversation
//! store, stream ingestion, attachment encoding, and the session controller.
//! It depends only on `banter-types` -- never on `banter-infra` or any HTTP
//! crate.

pub mod attachment;
pub mod backend;
pub mod chat;
pub mod event;

#[cfg(test)]
pub(crate) mod test_support;
