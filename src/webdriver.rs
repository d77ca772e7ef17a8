// src/webdriver.rs
// Minimal W3C WebDriver client (geckodriver / headless Firefox).
// Covers only the commands the registration flow needs.

use std::time::Duration;

use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

pub const ENV_WEBDRIVER_URL: &str = "WEBDRIVER_URL";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Headroom over the page-load timeout for one HTTP round trip to the driver.
pub const COMMAND_SLACK: Duration = Duration::from_secs(30);

/// Key under which W3C drivers return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

pub type Result<T> = std::result::Result<T, WebDriverError>;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("WebDriver transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver command timed out: {0}")]
    Timeout(String),

    #[error("WebDriver error `{error}`: {message}")]
    Protocol { error: String, message: String },

    #[error("unexpected WebDriver response: {0}")]
    Malformed(String),
}

impl WebDriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WebDriverError::Timeout(_))
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    value: Value,
}

/// Opaque element reference handed out by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(pub String);

pub struct WebDriver {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriver {
    /// Start a headless Firefox session on the driver at `base_url` with
    /// `page_load` as its navigation timeout.
    pub async fn firefox_headless(base_url: &str, page_load: Duration) -> Result<Self> {
        Self::start(base_url, page_load, page_load + COMMAND_SLACK).await
    }

    /// Like [`WebDriver::firefox_headless`], but every HTTP call to the driver
    /// gives up after `request_timeout`. The session is closed again when it
    /// cannot be configured.
    pub async fn start(base_url: &str, page_load: Duration, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let caps = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": { "args": ["-headless"] }
                }
            }
        });
        let value = send(&client, Method::POST, &format!("{base_url}/session"), Some(caps)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Malformed("missing sessionId".into()))?
            .to_string();

        tracing::info!(session = %session_id, "WebDriver session started");
        let driver = Self {
            client,
            base_url,
            session_id,
        };

        if let Err(e) = driver.set_page_load_timeout(page_load).await {
            if let Err(q) = driver.quit().await {
                tracing::warn!(error = %q, "closing browser session failed");
            }
            return Err(e);
        }
        Ok(driver)
    }

    /// Driver address from `WEBDRIVER_URL`, falling back to the geckodriver default.
    pub fn url_from_env() -> String {
        std::env::var(ENV_WEBDRIVER_URL).unwrap_or_else(|_| DEFAULT_WEBDRIVER_URL.to_string())
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        send(&self.client, method, &url, body).await
    }

    pub async fn set_page_load_timeout(&self, timeout: Duration) -> Result<()> {
        let ms = timeout.as_millis() as u64;
        self.command(Method::POST, "/timeouts", Some(json!({ "pageLoad": ms })))
            .await
            .map(|_| ())
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    /// All elements matching a CSS selector; empty when nothing matches.
    pub async fn find_all(&self, css: &str) -> Result<Vec<ElementId>> {
        let value = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": "css selector", "value": css })),
            )
            .await?;
        let items = value
            .as_array()
            .ok_or_else(|| WebDriverError::Malformed("elements is not an array".into()))?;
        Ok(items
            .iter()
            .filter_map(|e| e.get(ELEMENT_KEY).and_then(Value::as_str))
            .map(|id| ElementId(id.to_string()))
            .collect())
    }

    pub async fn send_keys(&self, el: &ElementId, text: &str) -> Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", el.0),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    pub async fn clear(&self, el: &ElementId) -> Result<()> {
        self.command(Method::POST, &format!("/element/{}/clear", el.0), Some(json!({})))
            .await
            .map(|_| ())
    }

    pub async fn click(&self, el: &ElementId) -> Result<()> {
        self.command(Method::POST, &format!("/element/{}/click", el.0), Some(json!({})))
            .await
            .map(|_| ())
    }

    pub async fn quit(self) -> Result<()> {
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        send(&self.client, Method::DELETE, &url, None).await.map(|_| ())
    }
}

async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value> {
    let mut req = client.request(method, url);
    if let Some(b) = body {
        req = req.json(&b);
    }
    let resp = req.send().await.map_err(transport_error)?;
    let status = resp.status();
    let envelope: Envelope = resp.json().await.map_err(transport_error)?;

    if status.is_success() {
        return Ok(envelope.value);
    }
    Err(protocol_error(&envelope.value))
}

fn transport_error(e: reqwest::Error) -> WebDriverError {
    if e.is_timeout() {
        WebDriverError::Timeout(e.to_string())
    } else {
        WebDriverError::Http(e)
    }
}

fn protocol_error(value: &Value) -> WebDriverError {
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if error == "timeout" {
        WebDriverError::Timeout(message)
    } else {
        WebDriverError::Protocol { error, message }
    }
}
