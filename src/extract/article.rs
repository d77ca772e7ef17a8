// src/extract/article.rs
//! Article extraction from a downloaded HTML page: text, authors, dates, images, videos.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

use super::nlp::{self, NlpSummary};
use super::ArticleError;

fn sel(s: &str) -> Selector {
    Selector::parse(s).expect("valid selector")
}

static TITLE: Lazy<Selector> = Lazy::new(|| sel("title"));
static OG_TITLE: Lazy<Selector> = Lazy::new(|| sel(r#"meta[property="og:title"]"#));
static ARTICLE_P: Lazy<Selector> = Lazy::new(|| sel("article p"));
static ANY_P: Lazy<Selector> = Lazy::new(|| sel("p"));
static AUTHOR_META: Lazy<Selector> = Lazy::new(|| {
    sel(r#"meta[name="author"], meta[property="article:author"], meta[name="byl"], meta[name="dc.creator"]"#)
});
static AUTHOR_REL: Lazy<Selector> =
    Lazy::new(|| sel(r#"[rel="author"], [itemprop="author"] [itemprop="name"], .byline-author"#));
static DATE_META: Lazy<Selector> = Lazy::new(|| {
    sel(r#"meta[property="article:published_time"], meta[name="pubdate"], meta[name="publishdate"], meta[name="date"], meta[itemprop="datePublished"], meta[name="dc.date"]"#)
});
static DATE_TIME: Lazy<Selector> =
    Lazy::new(|| sel(r#"time[itemprop="datePublished"], time[datetime]"#));
static TOP_IMAGE: Lazy<Selector> = Lazy::new(|| {
    sel(r#"meta[property="og:image"], meta[name="twitter:image"], link[rel="image_src"]"#)
});
static FIRST_IMG: Lazy<Selector> = Lazy::new(|| sel("img[src]"));
static MEDIA: Lazy<Selector> =
    Lazy::new(|| sel("iframe[src], embed[src], video[src], video source[src], object[data]"));

/// Hosts whose embeds count as article videos.
const VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "youtube-nocookie.com",
    "youtu.be",
    "vimeo.com",
    "dailymotion.com",
    "peertube",
    "twitch.tv",
    "kickstarter.com",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Article {
    pub url: String,
    pub html: String,
    pub title: String,
    pub text: String,
    pub authors: Vec<String>,
    /// RFC 3339 when the page date could be parsed, else as found on the page.
    pub publish_date: Option<String>,
    pub top_image: Option<String>,
    pub movies: Vec<String>,
}

impl Article {
    /// Parse a downloaded page. Fails only for an empty document.
    pub fn parse(url: &str, html: &str) -> Result<Self, ArticleError> {
        if html.trim().is_empty() {
            return Err(ArticleError::Parse(format!("{url}: empty document")));
        }
        let doc = Html::parse_document(html);
        let base = Url::parse(url).ok();

        Ok(Self {
            url: url.to_string(),
            html: html.to_string(),
            title: title(&doc),
            text: body_text(&doc),
            authors: authors(&doc),
            publish_date: publish_date(&doc),
            top_image: top_image(&doc, base.as_ref()),
            movies: movies(&doc, base.as_ref()),
        })
    }

    /// Keywords and summary. Fails when there is no text to analyse.
    pub fn nlp(&self) -> Result<NlpSummary, ArticleError> {
        nlp::analyze(&self.title, &self.text)
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn attr<'a>(el: &ElementRef<'a>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|n| el.value().attr(n))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn title(doc: &Html) -> String {
    doc.select(&OG_TITLE)
        .find_map(|el| attr(&el, &["content"]).map(str::to_string))
        .or_else(|| doc.select(&TITLE).next().map(element_text))
        .map(|t| collapse_ws(&t))
        .unwrap_or_default()
}

fn body_text(doc: &Html) -> String {
    let mut paragraphs: Vec<String> = doc
        .select(&ARTICLE_P)
        .map(|p| collapse_ws(&element_text(p)))
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.is_empty() {
        paragraphs = doc
            .select(&ANY_P)
            .map(|p| collapse_ws(&element_text(p)))
            .filter(|p| !p.is_empty())
            .collect();
    }
    paragraphs.join("\n\n")
}

fn authors(doc: &Html) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let from_meta = doc
        .select(&AUTHOR_META)
        .filter_map(|el| attr(&el, &["content"]).map(str::to_string));
    let from_markup = doc.select(&AUTHOR_REL).map(|el| collapse_ws(&element_text(el)));

    for name in from_meta.chain(from_markup) {
        let name = name.trim().trim_start_matches("By ").trim_start_matches("by ").trim();
        // article:author is often a profile URL rather than a name
        if name.is_empty() || name.starts_with("http://") || name.starts_with("https://") {
            continue;
        }
        if seen.insert(name.to_lowercase()) {
            out.push(name.to_string());
        }
    }
    out
}

fn publish_date(doc: &Html) -> Option<String> {
    let raw = doc
        .select(&DATE_META)
        .find_map(|el| attr(&el, &["content"]).map(str::to_string))
        .or_else(|| {
            doc.select(&DATE_TIME)
                .find_map(|el| attr(&el, &["datetime"]).map(str::to_string))
        })?;
    Some(normalize_date(&raw))
}

/// RFC 3339 for full timestamps, midnight UTC for bare dates, the raw string otherwise.
pub fn normalize_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.to_rfc3339();
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return dt.to_rfc3339();
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return dt.and_utc().to_rfc3339();
        }
    }
    raw.to_string()
}

fn absolutize(raw: &str, base: Option<&Url>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(u) => Some(u.to_string()),
        Err(_) => base?.join(raw).ok().map(|u| u.to_string()),
    }
}

fn top_image(doc: &Html, base: Option<&Url>) -> Option<String> {
    doc.select(&TOP_IMAGE)
        .find_map(|el| attr(&el, &["content", "href"]).and_then(|v| absolutize(v, base)))
        .or_else(|| {
            doc.select(&FIRST_IMG)
                .find_map(|el| attr(&el, &["src"]).and_then(|v| absolutize(v, base)))
        })
}

fn movies(doc: &Html, base: Option<&Url>) -> Vec<String> {
    let mut seen = HashSet::new();
    doc.select(&MEDIA)
        .filter_map(|el| attr(&el, &["src", "data"]).and_then(|v| absolutize(v, base)))
        .filter(|u| is_video_url(u))
        .filter(|u| seen.insert(u.clone()))
        .collect()
}

fn is_video_url(u: &str) -> bool {
    let Ok(url) = Url::parse(u) else {
        return false;
    };
    let host = url.host_str().unwrap_or_default();
    let is_file = url.path().ends_with(".mp4") || url.path().ends_with(".webm");
    is_file || VIDEO_HOSTS.iter().any(|h| host.contains(h))
}
