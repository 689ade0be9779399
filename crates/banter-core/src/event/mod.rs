//! Session event distribution for Banter.

pub mod bus;

pub use bus::EventBus;
