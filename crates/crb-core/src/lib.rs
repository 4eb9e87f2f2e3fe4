//! Core domain + application logic for the channel relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the
//! translation backend live behind ports (traits) implemented in adapter
//! crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod format;
pub mod logging;
pub mod notify;
pub mod ports;
pub mod relay;
pub mod signature;
pub mod state;

pub use errors::{Error, Result};
