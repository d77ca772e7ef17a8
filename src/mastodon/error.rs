// src/mastodon/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MastodonError {
    #[error("Mastodon API transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned HTTP {status}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("instance version {found} does not support {feature} (needs {required})")]
    Version {
        found: String,
        required: String,
        feature: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, MastodonError>;
