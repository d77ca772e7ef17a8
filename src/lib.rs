// src/lib.rs
// Library surface shared by the three binaries and the integration tests.

pub mod ail;
pub mod cache;
pub mod config;
pub mod directory;
pub mod extract;
pub mod feeder;
pub mod files;
pub mod mailbox;
pub mod mastodon;
pub mod signup;
pub mod telemetry;
pub mod webdriver;

// ---- Re-exports for the binaries ----
pub use crate::config::FeederConfig;
pub use crate::feeder::{FeedStats, Feeder, InstanceSearch, MastodonSearch};
pub use crate::files::Credentials;
