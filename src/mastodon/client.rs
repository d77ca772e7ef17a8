// src/mastodon/client.rs
// Mastodon API HTTP client.
// Registers a fresh OAuth app on every connect, logs in with the password
// grant, and gates endpoints on the version the instance reports.

use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Response};
use tracing::info;

use super::error::{MastodonError, Result};
use super::types::{AppRegistration, InstanceInfo, SearchResults, Token};
use crate::files::Credentials;

const OOB_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";
const SCOPES: &str = "read";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// First version that ships `GET /api/v2/search`.
pub const SEARCH_V2_SINCE: Version = Version(2, 4, 1);
/// `GET /api/v1/search` covers older instances back to this version.
pub const SEARCH_V1_SINCE: Version = Version(1, 1, 0);

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\.(\d+)(?:\.(\d+))?").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub u32, pub u32, pub u32);

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Leading `major.minor[.patch]` of a server version string such as
/// `4.2.1+glitch` or `2.7.2 (compatible; Pleroma 2.5.0)`.
pub fn parse_version(raw: &str) -> Option<Version> {
    let caps = VERSION_RE.captures(raw)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let patch = caps
        .get(3)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some(Version(major, minor, patch))
}

/// Search endpoint served by an instance reporting `version`, newest first.
pub fn search_endpoint(version: Option<Version>) -> Option<&'static str> {
    match version? {
        v if v >= SEARCH_V2_SINCE => Some("/api/v2/search"),
        v if v >= SEARCH_V1_SINCE => Some("/api/v1/search"),
        _ => None,
    }
}

/// Authenticated session on one instance.
pub struct MastodonClient {
    client: Client,
    base_url: String,
    access_token: String,
    version_raw: String,
    version: Option<Version>,
}

impl MastodonClient {
    /// Connect to `https://{host}`.
    pub async fn connect(host: &str, client_name: &str, creds: &Credentials) -> Result<Self> {
        Self::connect_to(&format!("https://{host}"), client_name, creds).await
    }

    /// Register the app, log in, and read the instance version.
    pub async fn connect_to(base_url: &str, client_name: &str, creds: &Credentials) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let app: AppRegistration = check(
            "/api/v1/apps",
            client
                .post(format!("{base_url}/api/v1/apps"))
                .form(&[
                    ("client_name", client_name),
                    ("redirect_uris", OOB_REDIRECT),
                    ("scopes", SCOPES),
                ])
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;

        let token: Token = check(
            "/oauth/token",
            client
                .post(format!("{base_url}/oauth/token"))
                .form(&[
                    ("grant_type", "password"),
                    ("client_id", app.client_id.as_str()),
                    ("client_secret", app.client_secret.as_str()),
                    ("username", creds.email.as_str()),
                    ("password", creds.password.as_str()),
                    ("scope", SCOPES),
                ])
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;

        let instance: InstanceInfo = check(
            "/api/v1/instance",
            client
                .get(format!("{base_url}/api/v1/instance"))
                .bearer_auth(&token.access_token)
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;

        let version = parse_version(&instance.version);
        info!(base_url = %base_url, version = %instance.version, "logged in");

        Ok(Self {
            client,
            base_url,
            access_token: token.access_token,
            version_raw: instance.version,
            version,
        })
    }

    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Search accounts, statuses and hashtags, on v2 when the instance has it
    /// and v1 otherwise. `resolve` lets the instance webfinger remote results.
    pub async fn search(&self, query: &str, resolve: bool) -> Result<SearchResults> {
        let endpoint = search_endpoint(self.version).ok_or_else(|| MastodonError::Version {
            found: self.version_raw.clone(),
            required: SEARCH_V1_SINCE.to_string(),
            feature: "search",
        })?;

        let resolve = if resolve { "true" } else { "false" };
        let resp = self
            .client
            .get(format!("{}{endpoint}", self.base_url))
            .bearer_auth(&self.access_token)
            .query(&[("q", query), ("resolve", resolve)])
            .send()
            .await?;

        Ok(check(endpoint, resp).await?.json().await?)
    }
}

/// Check response status and convert errors.
async fn check(endpoint: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(MastodonError::Api {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message: response.text().await.unwrap_or_default(),
    })
}
