// src/extract/fetch.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use tracing::info;

use super::{Article, ArticleError};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Downloads the raw HTML behind a URL.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn download(&self, url: &str) -> Result<String, ArticleError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(5))
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArticleFetcher for HttpFetcher {
    async fn download(&self, url: &str) -> Result<String, ArticleError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ArticleError::Download(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ArticleError::Download(format!("{url}: HTTP {status}")));
        }
        resp.text()
            .await
            .map_err(|e| ArticleError::Download(e.to_string()))
    }
}

/// Download under a hard deadline, then parse.
pub async fn fetch_article<F>(fetcher: &F, url: &str, deadline: Duration) -> Result<Article, ArticleError>
where
    F: ArticleFetcher + ?Sized,
{
    info!(url, "downloading and parsing");
    let html = tokio::time::timeout(deadline, fetcher.download(url))
        .await
        .map_err(|_| ArticleError::Timeout(deadline))??;
    Article::parse(url, &html)
}
