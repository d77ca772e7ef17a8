// src/extract/urls.rs
//! URL-like substrings in free text, and the validation gate in front of the fetcher.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use url::{Host, Url};

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"'`]+"#).expect("valid regex"));

/// Every URL-like substring of `text`, in order of appearance, without repeats.
/// HTML entities are decoded first so markup such as `href="..."` yields its target.
pub fn find_urls(text: &str) -> Vec<String> {
    let decoded = html_escape::decode_html_entities(text);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for m in URL_RE.find_iter(&decoded) {
        let u = trim_trailing_punctuation(m.as_str());
        if !u.is_empty() && seen.insert(u.to_string()) {
            out.push(u.to_string());
        }
    }
    out
}

fn trim_trailing_punctuation(s: &str) -> &str {
    let mut s = s;
    loop {
        let Some(last) = s.chars().last() else {
            return s;
        };
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            ')' => s.matches('(').count() < s.matches(')').count(),
            ']' => s.matches('[').count() < s.matches(']').count(),
            _ => false,
        };
        if !strip {
            return s;
        }
        s = &s[..s.len() - last.len_utf8()];
    }
}

/// First whitespace-delimited token of an extracted substring.
pub fn candidate(raw: &str) -> Option<&str> {
    raw.split_whitespace().next()
}

/// Absolute http(s) URL with a dotted domain name or an IP address.
pub fn is_valid_url(s: &str) -> bool {
    let Ok(url) = Url::parse(s) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    match url.host() {
        Some(Host::Domain(d)) => is_domain(d),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        None => false,
    }
}

fn is_domain(d: &str) -> bool {
    let d = d.trim_end_matches('.');
    let labels: Vec<&str> = d.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|l| {
        !l.is_empty()
            && l.len() <= 63
            && !l.starts_with('-')
            && !l.ends_with('-')
            && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld = labels[labels.len() - 1];
    labels_ok
        && ((tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
            || tld.starts_with("xn--"))
}

/// Extracted, first-token, validated URLs of `text`.
pub fn valid_urls(text: &str) -> Vec<String> {
    find_urls(text)
        .iter()
        .filter_map(|raw| candidate(raw))
        .filter(|c| is_valid_url(c))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_two_urls_in_plain_bio() {
        let bio = "see http://evil.test/x and http://good.test/y";
        assert_eq!(find_urls(bio), vec!["http://evil.test/x", "http://good.test/y"]);
    }

    #[test]
    fn finds_href_in_mastodon_markup() {
        let html = r#"<p>read <a href="https://news.example.org/a?b=1&amp;c=2" rel="nofollow"><span class="invisible">https://</span><span>news.example.org/a</span></a></p>"#;
        let urls = valid_urls(html);
        assert_eq!(urls, vec!["https://news.example.org/a?b=1&c=2"]);
    }

    #[test]
    fn strips_sentence_punctuation_but_keeps_balanced_parens() {
        assert_eq!(
            find_urls("go to https://a.example/x."),
            vec!["https://a.example/x"]
        );
        assert_eq!(
            find_urls("(https://a.example/x)"),
            vec!["https://a.example/x"]
        );
        assert_eq!(
            find_urls("https://en.example/wiki/Rust_(language)"),
            vec!["https://en.example/wiki/Rust_(language)"]
        );
    }

    #[test]
    fn validation_rejects_schemeless_and_hostless() {
        assert!(is_valid_url("https://good.test/y"));
        assert!(is_valid_url("http://127.0.0.1:8080/x"));
        assert!(!is_valid_url("www.example.com"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("https://localhost/x"));
        assert!(!is_valid_url("ftp://files.example.com/a"));
        assert!(!is_valid_url("https://bad_host.example/x"));
    }

    #[test]
    fn candidate_takes_first_token() {
        assert_eq!(candidate("https://a.example/x trailing"), Some("https://a.example/x"));
        assert_eq!(candidate("   "), None);
    }
}
