// src/extract/mod.rs
pub mod article;
pub mod fetch;
pub mod nlp;
pub mod urls;

use std::time::Duration;
use thiserror::Error;

pub use article::Article;
pub use fetch::{fetch_article, ArticleFetcher, HttpFetcher};
pub use nlp::NlpSummary;
pub use urls::{candidate, find_urls, is_valid_url, valid_urls};

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("timeout reached after {0:?}")]
    Timeout(Duration),

    #[error("unable to download: {0}")]
    Download(String),

    #[error("unable to parse: {0}")]
    Parse(String),

    #[error("unable to nlp: {0}")]
    Nlp(String),
}
