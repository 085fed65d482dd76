//! Core domain + application logic for the Gaga WhatsApp bot.
//!
//! This crate is transport-agnostic. The WhatsApp Cloud API, OpenAI and
//! Gemini live behind ports (traits) implemented in adapter crates.

pub mod bot;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod media;
pub mod messaging;
pub mod moderation;
pub mod phone;
pub mod ports;
pub mod reminders;
pub mod security;
pub mod settings;
pub mod utils;

pub use errors::{Error, Result};
