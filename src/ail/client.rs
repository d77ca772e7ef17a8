// src/ail/client.rs
use std::io::Write;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::{write::GzEncoder, Compression};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    Client,
};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::info;

use super::{IngestSink, JsonItem};

/// Body of `POST /api/v1/import/json/item`.
#[derive(Serialize)]
struct ImportPayload<'a> {
    data: String,
    #[serde(rename = "data-sha256")]
    data_sha256: String,
    meta: &'a Map<String, Value>,
    source: &'a str,
    #[serde(rename = "source-uuid")]
    source_uuid: &'a str,
    #[serde(rename = "default-encoding")]
    default_encoding: &'a str,
}

/// gzip, then base64: the encoding AIL expects for `data`.
pub fn gzip64(data: &str) -> Result<String> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data.as_bytes())?;
    Ok(STANDARD.encode(enc.finish()?))
}

pub fn sha256_hex(data: &str) -> String {
    format!("{:x}", Sha256::digest(data.as_bytes()))
}

#[derive(Clone)]
pub struct AilClient {
    client: Client,
    api_base: String,
}

impl AilClient {
    /// Build the client and check the server answers `GET /api/v1/ping`.
    pub async fn connect(url: &str, api_key: &str, verify_ssl: bool) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(api_key).map_err(|e| anyhow!("invalid AIL api key: {e}"))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!verify_ssl)
            .timeout(Duration::from_secs(30))
            .build()
            .context("building AIL http client")?;

        let this = Self {
            client,
            api_base: format!("{}/api/v1", url.trim_end_matches('/')),
        };
        this.ping().await?;
        Ok(this)
    }

    pub async fn ping(&self) -> Result<()> {
        self.client
            .get(format!("{}/ping", self.api_base))
            .send()
            .await
            .context("AIL ping request failed")?
            .error_for_status()
            .context("AIL ping returned an error status")?;
        info!(api = %self.api_base, "AIL reachable");
        Ok(())
    }
}

#[async_trait::async_trait]
impl IngestSink for AilClient {
    async fn feed_json_item(&self, item: &JsonItem) -> Result<()> {
        let payload = ImportPayload {
            data: gzip64(&item.data)?,
            data_sha256: sha256_hex(&item.data),
            meta: &item.meta,
            source: &item.source,
            source_uuid: &item.uuid,
            default_encoding: &item.default_encoding,
        };

        self.client
            .post(format!("{}/import/json/item", self.api_base))
            .json(&payload)
            .send()
            .await
            .context("AIL import request failed")?
            .error_for_status()
            .context("AIL import returned an error status")?;
        Ok(())
    }
}
