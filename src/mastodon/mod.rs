// src/mastodon/mod.rs
// Mastodon REST client: app registration, password login, search.

pub mod client;
pub mod error;
pub mod types;

pub use client::{parse_version, MastodonClient, Version};
pub use error::{MastodonError, Result};
pub use types::*;
