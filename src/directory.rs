// src/directory.rs
// Client for the instances.social directory API.
// See https://instances.social/api/doc/

use anyhow::{anyhow, Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
};
use serde::Deserialize;

pub const DEFAULT_DIRECTORY_BASE: &str = "https://instances.social/api/1.0";
pub const ENV_DIRECTORY_TOKEN: &str = "INSTANCES_SOCIAL_TOKEN";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InstanceEntry {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct InstanceList {
    instances: Vec<InstanceEntry>,
}

pub struct DirectoryClient {
    client: Client,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| anyhow!("invalid directory token: {e}"))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("building directory http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Read the token from `INSTANCES_SOCIAL_TOKEN` and use the public endpoint.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(ENV_DIRECTORY_TOKEN)
            .map_err(|_| anyhow!("missing {ENV_DIRECTORY_TOKEN} env var"))?;
        Self::new(DEFAULT_DIRECTORY_BASE, &token)
    }

    /// Every public instance that is neither closed nor currently down.
    pub async fn list_instances(&self) -> Result<Vec<InstanceEntry>> {
        let url = format!("{}/instances/list", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("count", "0"),
                ("include_down", "false"),
                ("include_closed", "false"),
            ])
            .send()
            .await
            .context("directory http get()")?
            .error_for_status()
            .context("directory returned an error status")?;

        let list: InstanceList = resp.json().await.context("parsing directory response")?;
        Ok(list.instances)
    }
}
