// src/mastodon/types.rs
// Response types for the Mastodon REST endpoints used by the feeder.
// Nested objects the feeder only passes through stay as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /api/v1/apps`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppRegistration {
    pub client_id: String,
    pub client_secret: String,
}

/// `POST /oauth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub access_token: String,
}

/// `GET /api/v1/instance` (only the field we need).
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceInfo {
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub acct: String,
    #[serde(default)]
    pub display_name: String,
    pub created_at: String,
    /// Bio, HTML.
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub statuses_count: u64,
    pub bot: Option<bool>,
    pub group: Option<bool>,
    pub discoverable: Option<bool>,
    pub last_status_at: Option<String>,
    pub emojis: Option<Vec<Value>>,
    pub fields: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Status {
    pub id: String,
    pub uri: String,
    pub url: Option<String>,
    pub account: Value,
    pub in_reply_to_id: Option<String>,
    pub in_reply_to_account_id: Option<String>,
    /// Body, HTML.
    #[serde(default)]
    pub content: String,
    pub created_at: String,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub spoiler_text: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub mentions: Vec<Value>,
    #[serde(default)]
    pub media_attachments: Vec<Value>,
    #[serde(default)]
    pub emojis: Vec<Value>,
    #[serde(default)]
    pub tags: Vec<Value>,
}

/// `GET /api/v2/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub statuses: Vec<Status>,
    #[serde(default)]
    pub hashtags: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_account_fields_stay_absent() {
        let raw = r#"{
            "id": "109", "username": "alice", "acct": "alice", "display_name": "Alice",
            "created_at": "2022-11-05T00:00:00.000Z", "note": "<p>hi</p>",
            "url": "https://a.social/@alice", "followers_count": 3,
            "following_count": 4, "statuses_count": 5
        }"#;
        let a: Account = serde_json::from_str(raw).unwrap();
        assert_eq!(a.id, "109");
        assert!(a.bot.is_none());
        assert!(a.fields.is_none());
        assert!(a.last_status_at.is_none());
    }

    #[test]
    fn search_results_tolerate_missing_lists() {
        let r: SearchResults = serde_json::from_str(r#"{"accounts": []}"#).unwrap();
        assert!(r.statuses.is_empty());
        assert!(r.hashtags.is_empty());
    }
}
