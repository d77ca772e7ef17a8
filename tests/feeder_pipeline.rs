// tests/feeder_pipeline.rs
//
// Dedup-forward pipeline against in-memory collaborators:
// - MemoryCache behind the DedupGate
// - RecordingSink instead of AIL
// - PageFetcher serving canned HTML (or hanging / failing) per URL

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::json;

use ail_feeder_activitypub::ail::{IngestSink, JsonItem, FEEDER_TYPE, URLEXTRACT_FEEDER_TYPE};
use ail_feeder_activitypub::cache::{DedupCache, DedupGate, MemoryCache};
use ail_feeder_activitypub::extract::{ArticleError, ArticleFetcher};
use ail_feeder_activitypub::mastodon::{Account, MastodonError, SearchResults, Status};
use ail_feeder_activitypub::{Feeder, InstanceSearch};

const UUID: &str = "a4cfd483-86dc-4900-9fb9-5cd6027b5d04";
const TTL: Duration = Duration::from_secs(86400);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const ARTICLE: &str = r#"<html><head><title>Leak</title>
<meta name="author" content="Ann Analyst"></head>
<body><article><p>Attackers leaked credentials from a forum.</p>
<p>The credentials leak affected many forum users.</p></article></body></html>"#;

const NO_TEXT: &str = "<html><head><title>Empty</title></head><body><div>nav</div></body></html>";

#[derive(Default)]
struct RecordingSink {
    items: Mutex<Vec<JsonItem>>,
    reject_source: Option<&'static str>,
}

impl RecordingSink {
    fn items(&self) -> Vec<JsonItem> {
        self.items.lock().unwrap().clone()
    }

    fn of(&self, source: &str) -> Vec<JsonItem> {
        self.items().into_iter().filter(|i| i.source == source).collect()
    }
}

#[async_trait]
impl IngestSink for RecordingSink {
    async fn feed_json_item(&self, item: &JsonItem) -> anyhow::Result<()> {
        if self.reject_source == Some(item.source.as_str()) {
            return Err(anyhow!("503 from AIL"));
        }
        self.items.lock().unwrap().push(item.clone());
        Ok(())
    }
}

enum Reply {
    Html(&'static str),
    Hang,
    Fail,
}

#[derive(Default)]
struct PageFetcher {
    pages: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
}

impl PageFetcher {
    fn page(mut self, url: &str, reply: Reply) -> Self {
        self.pages.insert(url.to_string(), reply);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArticleFetcher for PageFetcher {
    async fn download(&self, url: &str) -> Result<String, ArticleError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(Reply::Html(h)) => Ok(h.to_string()),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
            Some(Reply::Fail) | None => Err(ArticleError::Download(format!("{url}: HTTP 404"))),
        }
    }
}

fn account(id: &str, note: &str) -> Account {
    serde_json::from_value(json!({
        "id": id,
        "username": "watcher",
        "acct": "watcher@infosec.example",
        "display_name": "Watcher",
        "created_at": "2023-05-01T00:00:00.000Z",
        "note": note,
        "url": "https://infosec.example/@watcher",
        "followers_count": 10,
        "following_count": 2,
        "statuses_count": 99,
        "last_status_at": "2024-02-02"
    }))
    .unwrap()
}

fn status(id: &str, content: &str) -> Status {
    serde_json::from_value(json!({
        "id": id,
        "uri": format!("https://infosec.example/users/watcher/statuses/{id}"),
        "url": format!("https://infosec.example/@watcher/{id}"),
        "account": {"id": "1", "acct": "watcher"},
        "in_reply_to_id": null,
        "in_reply_to_account_id": null,
        "content": content,
        "created_at": "2024-02-02T10:00:00.000Z",
        "sensitive": false,
        "spoiler_text": "",
        "visibility": "public",
        "mentions": [],
        "media_attachments": [],
        "emojis": [],
        "tags": [{"name": "leak"}]
    }))
    .unwrap()
}

fn feeder(
    cache: Arc<MemoryCache>,
    caching: bool,
    sink: Arc<RecordingSink>,
    fetcher: Arc<PageFetcher>,
) -> Feeder {
    Feeder::new(DedupGate::new(cache, TTL, caching), sink, fetcher, UUID, FETCH_TIMEOUT)
}

#[tokio::test]
async fn account_and_status_are_forwarded_with_metadata() {
    let cache = Arc::new(MemoryCache::new());
    let sink = Arc::new(RecordingSink::default());
    let fetcher = Arc::new(PageFetcher::default());
    let mut f = feeder(cache.clone(), true, sink.clone(), fetcher);

    let results = SearchResults {
        accounts: vec![account("7", "<p>threat intel</p>")],
        statuses: vec![status("100", "<p>dump posted</p>")],
        hashtags: vec![],
    };
    f.process_results(&results).await;

    let items = sink.of(FEEDER_TYPE);
    assert_eq!(items.len(), 2);

    let acc = &items[0];
    assert_eq!(acc.uuid, UUID);
    assert_eq!(acc.default_encoding, "UTF-8");
    assert_eq!(acc.data, "<p>threat intel</p>");
    assert_eq!(acc.meta["account:id"], "7");
    assert_eq!(acc.meta["account:name"], "watcher@infosec.example");
    assert_eq!(acc.meta["last_status"], "2024-02-02");
    assert!(!acc.meta.contains_key("bot"));

    let st = &items[1];
    assert_eq!(st.data, "<p>dump posted</p>");
    assert_eq!(st.meta["status:id"], "100");
    assert_eq!(st.meta["tags"], json!([{"name": "leak"}]));

    assert_eq!(cache.get("c:7").as_deref(), Some("<p>threat intel</p>"));
    assert_eq!(cache.get("s:100").as_deref(), Some("<p>dump posted</p>"));
}

#[tokio::test]
async fn cached_items_are_never_forwarded_again() {
    let cache = Arc::new(MemoryCache::new());
    let sink = Arc::new(RecordingSink::default());
    let fetcher = Arc::new(PageFetcher::default().page("https://news.example/leak", Reply::Html(ARTICLE)));
    let results = SearchResults {
        accounts: vec![account("7", "bio https://news.example/leak")],
        statuses: vec![status("100", "see https://news.example/leak")],
        hashtags: vec![],
    };

    let mut first = feeder(cache.clone(), true, sink.clone(), fetcher.clone());
    first.process_results(&results).await;
    let after_first = sink.items().len();
    assert_eq!(after_first, 3, "account, status, one article");

    let mut second = feeder(cache.clone(), true, sink.clone(), fetcher.clone());
    second.process_results(&results).await;
    assert_eq!(sink.items().len(), after_first);
    assert_eq!(fetcher.calls().len(), 1);
    assert_eq!(second.stats().items_cached, 2);
}

#[tokio::test]
async fn nocache_forwards_each_item_exactly_once_per_run() {
    let cache = Arc::new(MemoryCache::new());
    // pre-seeded from an earlier run
    cache.set_with_ttl("c:7", "old bio", TTL).await.unwrap();
    let sink = Arc::new(RecordingSink::default());
    let fetcher = Arc::new(PageFetcher::default());
    let mut f = feeder(cache.clone(), false, sink.clone(), fetcher);

    let results = SearchResults {
        accounts: vec![account("7", "new bio")],
        statuses: vec![status("100", "post")],
        hashtags: vec![],
    };
    f.process_results(&results).await;

    let items = sink.of(FEEDER_TYPE);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].meta["account:id"], "7");
    assert_eq!(items[1].meta["status:id"], "100");
    // existing key is not rewritten
    assert_eq!(cache.get("c:7").as_deref(), Some("old bio"));
}

#[tokio::test]
async fn invalid_urls_never_reach_the_fetcher() {
    let sink = Arc::new(RecordingSink::default());
    let fetcher = Arc::new(PageFetcher::default());
    let mut f = feeder(Arc::new(MemoryCache::new()), true, sink.clone(), fetcher.clone());

    f.process_status(&status("1", "links: http://localhost/x www.no-scheme.example ftp://files.example/a"))
        .await;

    assert!(fetcher.calls().is_empty());
    assert!(sink.of(URLEXTRACT_FEEDER_TYPE).is_empty());
    assert_eq!(sink.of(FEEDER_TYPE).len(), 1);
}

#[tokio::test]
async fn two_urls_in_a_bio_are_each_fetched_and_forwarded() {
    let cache = Arc::new(MemoryCache::new());
    let sink = Arc::new(RecordingSink::default());
    let fetcher = Arc::new(
        PageFetcher::default()
            .page("http://evil.test/x", Reply::Html(ARTICLE))
            .page("http://good.test/y", Reply::Html(ARTICLE)),
    );
    let mut f = feeder(cache.clone(), true, sink.clone(), fetcher.clone());
    let bio = "see http://evil.test/x and http://good.test/y";

    f.process_account(&account("42", bio)).await;

    assert_eq!(fetcher.calls(), vec!["http://evil.test/x", "http://good.test/y"]);
    let urls = sink.of(URLEXTRACT_FEEDER_TYPE);
    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0].meta["activitypub:url-extracted"], "http://evil.test/x");
    assert_eq!(urls[1].meta["activitypub:url-extracted"], "http://good.test/y");
    assert_eq!(urls[0].meta["activitypub:account_id"], "42");
    assert_eq!(urls[0].data, ARTICLE);
    assert_eq!(urls[0].meta["newspaper:authors"], json!(["Ann Analyst"]));
    assert!(urls[0].meta["newspaper:keywords"]
        .as_array()
        .unwrap()
        .contains(&json!("credentials")));

    // each URL gated independently, source body as value
    assert_eq!(cache.get("cu:aHR0cDovL2V2aWwudGVzdC94").as_deref(), Some(bio));
    assert_eq!(cache.get("cu:aHR0cDovL2dvb2QudGVzdC95").as_deref(), Some(bio));
}

#[tokio::test]
async fn nlp_failure_forwards_base_meta_once() {
    let sink = Arc::new(RecordingSink::default());
    let fetcher = Arc::new(PageFetcher::default().page("https://blank.example/", Reply::Html(NO_TEXT)));
    let mut f = feeder(Arc::new(MemoryCache::new()), true, sink.clone(), fetcher);

    f.process_status(&status("5", "https://blank.example/")).await;

    let urls = sink.of(URLEXTRACT_FEEDER_TYPE);
    assert_eq!(urls.len(), 1);
    let keys: Vec<&str> = urls[0].meta.keys().map(String::as_str).collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(urls[0].meta["activitypub:status_id"], "5");
    assert_eq!(urls[0].meta["activitypub:url-extracted"], "https://blank.example/");
    assert_eq!(urls[0].data, NO_TEXT);
}

#[tokio::test(start_paused = true)]
async fn slow_or_broken_downloads_are_dropped() {
    let sink = Arc::new(RecordingSink::default());
    let fetcher = Arc::new(
        PageFetcher::default()
            .page("https://slow.example/a", Reply::Hang)
            .page("https://gone.example/b", Reply::Fail)
            .page("https://ok.example/c", Reply::Html(ARTICLE)),
    );
    let mut f = feeder(Arc::new(MemoryCache::new()), true, sink.clone(), fetcher.clone());

    f.process_status(&status("9", "https://slow.example/a https://gone.example/b https://ok.example/c"))
        .await;

    assert_eq!(fetcher.calls().len(), 3);
    let urls = sink.of(URLEXTRACT_FEEDER_TYPE);
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].meta["activitypub:url-extracted"], "https://ok.example/c");
    assert_eq!(f.stats().urls_dropped, 2);
}

#[tokio::test]
async fn sink_failure_does_not_stop_the_pipeline() {
    let sink = Arc::new(RecordingSink {
        items: Mutex::default(),
        reject_source: Some(FEEDER_TYPE),
    });
    let fetcher = Arc::new(PageFetcher::default().page("https://news.example/leak", Reply::Html(ARTICLE)));
    let mut f = feeder(Arc::new(MemoryCache::new()), true, sink.clone(), fetcher);

    f.process_account(&account("1", "https://news.example/leak")).await;

    assert_eq!(sink.of(URLEXTRACT_FEEDER_TYPE).len(), 1);
    assert_eq!(f.stats().sink_errors, 1);
    assert_eq!(f.stats().accounts_forwarded, 0);
}

struct ScriptedSearch {
    results: HashMap<&'static str, SearchResults>,
}

#[async_trait]
impl InstanceSearch for ScriptedSearch {
    async fn search(&self, instance: &str, _query: &str) -> Result<SearchResults, MastodonError> {
        match instance {
            "old.social" => Err(MastodonError::Version {
                found: "1.0.0".into(),
                required: "1.1.0".into(),
                feature: "search",
            }),
            "down.social" => Err(MastodonError::Api {
                endpoint: "/oauth/token".into(),
                status: 401,
                message: "invalid_grant".into(),
            }),
            other => Ok(self.results.get(other).cloned().unwrap_or_default()),
        }
    }
}

#[tokio::test]
async fn failing_instances_are_skipped() {
    let sink = Arc::new(RecordingSink::default());
    let mut f = feeder(
        Arc::new(MemoryCache::new()),
        true,
        sink.clone(),
        Arc::new(PageFetcher::default()),
    );
    let search = ScriptedSearch {
        results: [(
            "good.social",
            SearchResults {
                accounts: vec![],
                statuses: vec![status("3", "found it")],
                hashtags: vec![json!({"name": "leak"})],
            },
        )]
        .into_iter()
        .collect(),
    };
    let instances: Vec<String> = ["old.social", "down.social", "good.social"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let stats = f.run(&search, &instances, "leak").await;

    assert_eq!(stats.instances_failed, 2);
    assert_eq!(stats.instances_searched, 1);
    assert_eq!(stats.statuses_forwarded, 1);
    assert_eq!(sink.items().len(), 1);
}
