//! Deterministic, pure logic shared by the bot.
//!
//! Core modules must be free of I/O side effects. They operate on strings and
//! in-memory values so every rule can be tested without a checkout.

pub mod listing;
pub mod manifest;
pub mod slug;
pub mod types;
pub mod version;
