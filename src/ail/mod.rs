// src/ail/mod.rs
pub mod client;

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};

pub use client::AilClient;

/// Feeder type of account and status records.
pub const FEEDER_TYPE: &str = "ail-feeder-activitypub";
/// Feeder type of articles behind extracted URLs.
pub const URLEXTRACT_FEEDER_TYPE: &str = "ail_feeder_urlextract";
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// One normalized record handed to the ingestion sink.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JsonItem {
    pub source: String,
    pub uuid: String,
    #[serde(rename = "default-encoding")]
    pub default_encoding: String,
    pub meta: Map<String, Value>,
    pub data: String,
}

impl JsonItem {
    pub fn new(source: &str, uuid: &str, meta: Map<String, Value>, data: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            uuid: uuid.to_string(),
            default_encoding: DEFAULT_ENCODING.to_string(),
            meta,
            data: data.into(),
        }
    }
}

#[async_trait::async_trait]
pub trait IngestSink: Send + Sync {
    async fn feed_json_item(&self, item: &JsonItem) -> Result<()>;
}
