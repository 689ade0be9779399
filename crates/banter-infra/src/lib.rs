//! Infrastructure layer for Banter.
//!
//! Contains the implementations behind the ports defined in `banter-core`:
//! the HTTP `BackendClient`, file-backed attachment sources, data directory
//! resolution, and config loading.

pub mod config;
pub mod filesystem;
pub mod http;
