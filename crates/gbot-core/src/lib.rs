//! Core domain + application logic for the grammar-correction bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the grammar
//! service live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod guard;
pub mod logging;
pub mod messaging;
pub mod provider;
pub mod relay;
pub mod reply;

pub use errors::{Error, Result};
