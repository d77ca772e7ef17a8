// src/extract/nlp.rs
//! Light keyword + summary extraction over article text. Frequency based, no model.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use super::ArticleError;

pub const KEYWORD_COUNT: usize = 10;
pub const SUMMARY_SENTENCES: usize = 5;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}][\p{L}\p{N}'-]*").expect("valid regex"));
// a line without terminal punctuation (heading, list item) is its own sentence
static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)[^.!?\n]+(?:[.!?]+|$)").expect("valid regex"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down",
        "during", "each", "even", "few", "for", "from", "further", "had", "has", "have",
        "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "i",
        "if", "in", "into", "is", "it", "its", "itself", "just", "like", "many", "may", "me",
        "might", "more", "most", "much", "must", "my", "myself", "new", "no", "nor", "not",
        "now", "of", "off", "on", "once", "one", "only", "or", "other", "our", "ours",
        "ourselves", "out", "over", "own", "said", "same", "says", "she", "should", "since",
        "so", "some", "still", "such", "than", "that", "the", "their", "theirs", "them",
        "themselves", "then", "there", "these", "they", "this", "those", "through", "to",
        "too", "two", "under", "until", "up", "us", "very", "was", "we", "were", "what",
        "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would",
        "yet", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NlpSummary {
    pub keywords: Vec<String>,
    pub summary: String,
}

fn tokens(s: &str) -> impl Iterator<Item = String> + '_ {
    WORD_RE
        .find_iter(s)
        .map(|m| m.as_str().trim_matches(|c: char| c == '\'' || c == '-').to_lowercase())
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(w.as_str()))
}

/// Term frequencies over title and text; title words count double.
fn frequencies(title: &str, text: &str) -> HashMap<String, usize> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for w in tokens(text) {
        *freq.entry(w).or_default() += 1;
    }
    for w in tokens(title) {
        *freq.entry(w).or_default() += 2;
    }
    freq
}

pub fn keywords(title: &str, text: &str, n: usize) -> Vec<String> {
    let mut ranked: Vec<(String, usize)> = frequencies(title, text).into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(n).map(|(w, _)| w).collect()
}

/// Top `n` sentences by keyword density, in their original order.
pub fn summarize(title: &str, text: &str, n: usize) -> String {
    let freq = frequencies(title, text);
    let sentences: Vec<&str> = SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();

    let mut scored: Vec<(usize, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let words: Vec<String> = tokens(s).collect();
            let total: usize = words.iter().map(|w| freq.get(w).copied().unwrap_or(0)).sum();
            let score = if words.is_empty() {
                0.0
            } else {
                total as f64 / words.len() as f64
            };
            (i, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut picked: Vec<usize> = scored.into_iter().take(n).map(|(i, _)| i).collect();
    picked.sort_unstable();
    picked
        .into_iter()
        .map(|i| sentences[i])
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn analyze(title: &str, text: &str) -> Result<NlpSummary, ArticleError> {
    if text.trim().is_empty() {
        return Err(ArticleError::Nlp("article has no text to analyze".into()));
    }
    Ok(NlpSummary {
        keywords: keywords(title, text, KEYWORD_COUNT),
        summary: summarize(title, text, SUMMARY_SENTENCES),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_skip_stopwords_and_rank_by_frequency() {
        let kw = keywords(
            "Ransomware gang",
            "The ransomware hit hospitals. The ransomware spread fast. Hospitals paid.",
            3,
        );
        // title words count double, ties break alphabetically
        assert_eq!(kw, vec!["ransomware", "gang", "hospitals"]);
    }

    #[test]
    fn summary_keeps_original_sentence_order() {
        let text = "Cats sleep. Phishing kits target banks. Banks warn about phishing kits. Dogs bark.";
        let s = summarize("Phishing kits", text, 2);
        assert_eq!(s, "Phishing kits target banks. Banks warn about phishing kits.");
    }

    #[test]
    fn unterminated_lines_are_sentences() {
        let text = "Ransomware gang strikes again\nThe weather was mild. Nothing else happened.";
        assert_eq!(summarize("Ransomware gang", text, 1), "Ransomware gang strikes again");
        let all = summarize("x", "Heading\n- first item\nLast line.", 5);
        assert_eq!(all, "Heading - first item Last line.");
    }

    #[test]
    fn empty_text_fails() {
        assert!(matches!(analyze("t", "   "), Err(ArticleError::Nlp(_))));
    }
}
