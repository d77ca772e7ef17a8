// src/feeder/meta.rs
//! Metadata records forwarded alongside each item. Field names are what AIL
//! correlates on, so they stay stable.

use serde_json::{json, Map, Value};

use crate::extract::{Article, NlpSummary};
use crate::mastodon::{Account, Status};

/// Which search hit a URL was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlOrigin<'a> {
    Account(&'a str),
    Status(&'a str),
}

pub fn account_meta(a: &Account) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("account:id".into(), json!(a.id));
    m.insert("account:username".into(), json!(a.username));
    m.insert("account:display_name".into(), json!(a.display_name));
    m.insert("account:name".into(), json!(a.acct));
    if let Some(bot) = a.bot {
        m.insert("bot".into(), json!(bot));
    }
    if let Some(group) = a.group {
        m.insert("group".into(), json!(group));
    }
    if let Some(discoverable) = a.discoverable {
        m.insert("discoverable".into(), json!(discoverable));
    }
    m.insert("created_at".into(), json!(a.created_at));
    m.insert("bio".into(), json!(a.note));
    m.insert("account:url".into(), json!(a.url));
    m.insert("followers".into(), json!(a.followers_count));
    m.insert("following".into(), json!(a.following_count));
    m.insert("statuses".into(), json!(a.statuses_count));
    if let Some(last) = &a.last_status_at {
        m.insert("last_status".into(), json!(last));
    }
    if let Some(emojis) = &a.emojis {
        m.insert("emojis".into(), json!(emojis));
    }
    if let Some(fields) = &a.fields {
        m.insert("fields".into(), json!(fields));
    }
    m
}

pub fn status_meta(s: &Status) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("status:id".into(), json!(s.id));
    m.insert("status:uri".into(), json!(s.uri));
    m.insert("status:url".into(), json!(s.url));
    m.insert("account".into(), s.account.clone());
    m.insert("reply_to:id".into(), json!(s.in_reply_to_id));
    m.insert("reply_to:account_id".into(), json!(s.in_reply_to_account_id));
    m.insert("content".into(), json!(s.content));
    m.insert("created".into(), json!(s.created_at));
    m.insert("sensitive".into(), json!(s.sensitive));
    m.insert("spoiler_text".into(), json!(s.spoiler_text));
    m.insert("visibility".into(), json!(s.visibility));
    m.insert("mentions".into(), json!(s.mentions));
    m.insert("attachments".into(), json!(s.media_attachments));
    m.insert("emojis".into(), json!(s.emojis));
    m.insert("tags".into(), json!(s.tags));
    m
}

/// Base record for an extracted URL, before any article analysis.
pub fn url_meta(origin: UrlOrigin<'_>, url: &str) -> Map<String, Value> {
    let mut m = Map::new();
    match origin {
        UrlOrigin::Account(id) => m.insert("activitypub:account_id".into(), json!(id)),
        UrlOrigin::Status(id) => m.insert("activitypub:status_id".into(), json!(id)),
    };
    m.insert("activitypub:url-extracted".into(), json!(url));
    m
}

pub fn enrich_with_article(m: &mut Map<String, Value>, article: &Article, nlp: &NlpSummary) {
    m.insert("newspaper:text".into(), json!(article.text));
    m.insert("newspaper:authors".into(), json!(article.authors));
    m.insert("newspaper:keywords".into(), json!(nlp.keywords));
    m.insert("newspaper:summary".into(), json!(nlp.summary));
    m.insert("newspaper:publish_date".into(), json!(article.publish_date));
    m.insert("newspaper:top_image".into(), json!(article.top_image));
    m.insert("newspaper:movies".into(), json!(article.movies));
}
