//! HTTP implementation of the Banter backend contract.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::HttpBackendClient;
