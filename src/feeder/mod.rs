// src/feeder/mod.rs
// Search every ready instance, dedup the hits, forward accounts and statuses
// to AIL, then follow the URLs found in their text and forward the articles.

pub mod meta;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::ail::{IngestSink, JsonItem, FEEDER_TYPE, URLEXTRACT_FEEDER_TYPE};
use crate::cache::{account_key, status_key, url_key, DedupGate};
use crate::extract::{fetch_article, valid_urls, ArticleError, ArticleFetcher};
use crate::files::Credentials;
use crate::mastodon::{Account, MastodonClient, MastodonError, SearchResults, Status};

pub use meta::UrlOrigin;

/// Produces search results for one instance.
#[async_trait]
pub trait InstanceSearch: Send + Sync {
    async fn search(&self, instance: &str, query: &str) -> Result<SearchResults, MastodonError>;
}

/// Logs in to each instance over HTTPS and runs a search there.
pub struct MastodonSearch {
    client_name: String,
    credentials: Credentials,
    resolve: bool,
}

impl MastodonSearch {
    pub fn new(client_name: &str, credentials: Credentials, resolve: bool) -> Self {
        Self {
            client_name: client_name.to_string(),
            credentials,
            resolve,
        }
    }
}

#[async_trait]
impl InstanceSearch for MastodonSearch {
    async fn search(&self, instance: &str, query: &str) -> Result<SearchResults, MastodonError> {
        let client = MastodonClient::connect(instance, &self.client_name, &self.credentials).await?;
        client.search(query, self.resolve).await
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub instances_searched: usize,
    pub instances_failed: usize,
    pub accounts_forwarded: usize,
    pub statuses_forwarded: usize,
    /// Accounts and statuses skipped as already seen.
    pub items_cached: usize,
    pub urls_forwarded: usize,
    pub urls_cached: usize,
    /// Download, parse or timeout failures.
    pub urls_dropped: usize,
    pub sink_errors: usize,
}

pub struct Feeder {
    gate: DedupGate,
    sink: Arc<dyn IngestSink>,
    fetcher: Arc<dyn ArticleFetcher>,
    uuid: String,
    fetch_timeout: Duration,
    stats: FeedStats,
}

impl Feeder {
    pub fn new(
        gate: DedupGate,
        sink: Arc<dyn IngestSink>,
        fetcher: Arc<dyn ArticleFetcher>,
        uuid: &str,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            gate,
            sink,
            fetcher,
            uuid: uuid.to_string(),
            fetch_timeout,
            stats: FeedStats::default(),
        }
    }

    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    /// Search `query` on each instance in order. A failing instance is logged
    /// and skipped; nothing here aborts the run.
    pub async fn run<S>(&mut self, search: &S, instances: &[String], query: &str) -> FeedStats
    where
        S: InstanceSearch + ?Sized,
    {
        for instance in instances {
            info!(instance = %instance, "searching");
            match search.search(instance, query).await {
                Ok(results) => {
                    self.stats.instances_searched += 1;
                    self.process_results(&results).await;
                }
                Err(MastodonError::Version { found, .. }) => {
                    self.stats.instances_failed += 1;
                    warn!(instance = %instance, version = %found, "wrong version, skipping");
                }
                Err(e) => {
                    self.stats.instances_failed += 1;
                    warn!(instance = %instance, error = %e, "instance failed, skipping");
                }
            }
        }

        let s = self.stats;
        info!(
            searched = s.instances_searched,
            failed = s.instances_failed,
            accounts = s.accounts_forwarded,
            statuses = s.statuses_forwarded,
            cached = s.items_cached,
            urls = s.urls_forwarded,
            urls_cached = s.urls_cached,
            urls_dropped = s.urls_dropped,
            sink_errors = s.sink_errors,
            "feed run finished"
        );
        s
    }

    /// Accounts first, then statuses. Hashtags are not forwarded.
    pub async fn process_results(&mut self, results: &SearchResults) {
        info!(
            accounts = results.accounts.len(),
            statuses = results.statuses.len(),
            "processing search results"
        );
        for account in &results.accounts {
            self.process_account(account).await;
        }
        for status in &results.statuses {
            self.process_status(status).await;
        }
    }

    pub async fn process_account(&mut self, account: &Account) {
        if !self.admit_item(&account_key(&account.id), &account.note).await {
            return;
        }
        let item = JsonItem::new(FEEDER_TYPE, &self.uuid, meta::account_meta(account), account.note.as_str());
        if self.forward(&item).await {
            self.stats.accounts_forwarded += 1;
        }
        self.process_urls(&account.note, UrlOrigin::Account(&account.id)).await;
    }

    pub async fn process_status(&mut self, status: &Status) {
        if !self.admit_item(&status_key(&status.id), &status.content).await {
            return;
        }
        let item = JsonItem::new(FEEDER_TYPE, &self.uuid, meta::status_meta(status), status.content.as_str());
        if self.forward(&item).await {
            self.stats.statuses_forwarded += 1;
        }
        self.process_urls(&status.content, UrlOrigin::Status(&status.id)).await;
    }

    async fn admit_item(&mut self, key: &str, body: &str) -> bool {
        match self.gate.admit(key, body).await {
            Ok(a) if a.should_process() => true,
            Ok(_) => {
                info!(key, "already processed");
                self.stats.items_cached += 1;
                false
            }
            Err(e) => {
                // cache down: forward anyway
                warn!(key, error = ?e, "cache unavailable");
                true
            }
        }
    }

    async fn process_urls(&mut self, body: &str, origin: UrlOrigin<'_>) {
        for url in valid_urls(body) {
            self.process_url(&url, body, origin).await;
        }
    }

    /// At most one sink call per URL: enriched when analysis works, base meta otherwise.
    async fn process_url(&mut self, url: &str, body: &str, origin: UrlOrigin<'_>) {
        match self.gate.admit(&url_key(url), body).await {
            Ok(a) if a.should_process() => {}
            Ok(_) => {
                info!(url, "URL already processed");
                self.stats.urls_cached += 1;
                return;
            }
            Err(e) => warn!(url, error = ?e, "cache unavailable"),
        }

        let article = match fetch_article(self.fetcher.as_ref(), url, self.fetch_timeout).await {
            Ok(a) => a,
            Err(ArticleError::Timeout(after)) => {
                warn!(url, ?after, "timeout reached");
                self.stats.urls_dropped += 1;
                return;
            }
            Err(e) => {
                warn!(url, error = %e, "dropping URL");
                self.stats.urls_dropped += 1;
                return;
            }
        };

        let mut m = meta::url_meta(origin, url);
        match article.nlp() {
            Ok(nlp) => meta::enrich_with_article(&mut m, &article, &nlp),
            Err(e) => warn!(url, error = %e, "forwarding without article analysis"),
        }

        let item = JsonItem::new(URLEXTRACT_FEEDER_TYPE, &self.uuid, m, article.html);
        info!(url, "uploading URL to AIL");
        if self.forward(&item).await {
            self.stats.urls_forwarded += 1;
        }
    }

    async fn forward(&mut self, item: &JsonItem) -> bool {
        if tracing::enabled!(tracing::Level::INFO) {
            if let Ok(pretty) = serde_json::to_string_pretty(item) {
                info!(item = %pretty, "forwarding");
            }
        }
        match self.sink.feed_json_item(item).await {
            Ok(()) => true,
            Err(e) => {
                warn!(source = %item.source, error = ?e, "sink rejected item");
                self.stats.sink_errors += 1;
                false
            }
        }
    }
}
