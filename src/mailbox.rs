// src/mailbox.rs
//! Disposable mailbox used to receive registration confirmations.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rand::{rng, Rng};
use reqwest::Client;
use serde::Deserialize;

use crate::files::Credentials;

pub const DEFAULT_MAILBOX_BASE: &str = "https://www.1secmail.com/api/v1";

/// Domains served by the 1secmail API.
pub const MAILBOX_DOMAINS: &[&str] = &[
    "1secmail.com",
    "1secmail.org",
    "1secmail.net",
    "wwjmp.com",
    "esiix.com",
    "xojxe.com",
    "yoggm.com",
];

const LOGIN_LEN: usize = 10;

/// Identity used for every registration in one Account Creator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub login: String,
    pub domain: String,
    pub password: String,
}

impl Identity {
    pub fn generate(password: &str) -> Self {
        let mut rng = rng();
        let chars: Vec<char> = "abcdefghijklmnopqrstuvwxyz0123456789".chars().collect();
        let login: String = (0..LOGIN_LEN)
            .map(|_| chars[rng.random_range(0..chars.len())])
            .collect();
        let domain = MAILBOX_DOMAINS[rng.random_range(0..MAILBOX_DOMAINS.len())].to_string();
        Self {
            login,
            domain,
            password: password.to_string(),
        }
    }

    pub fn from_email(email: &str, password: &str) -> Result<Self> {
        let (login, domain) = email
            .split_once('@')
            .filter(|(l, d)| !l.is_empty() && !d.is_empty())
            .ok_or_else(|| anyhow!("not an email address: {email}"))?;
        Ok(Self {
            login: login.to_string(),
            domain: domain.to_string(),
            password: password.to_string(),
        })
    }

    pub fn email(&self) -> String {
        format!("{}@{}", self.login, self.domain)
    }

    /// The local part doubles as the account username.
    pub fn username(&self) -> &str {
        &self.login
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email(), self.password.clone())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MessageSummary {
    pub id: u64,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, rename = "textBody")]
    pub text_body: String,
    #[serde(default, rename = "htmlBody")]
    pub html_body: String,
}

#[async_trait]
pub trait Mailbox: Send + Sync {
    async fn messages(&self) -> Result<Vec<MessageSummary>>;
    async fn read(&self, id: u64) -> Result<Message>;
}

pub struct SecMailClient {
    client: Client,
    base_url: String,
    login: String,
    domain: String,
}

impl SecMailClient {
    pub fn new(base_url: &str, identity: &Identity) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            login: identity.login.clone(),
            domain: identity.domain.clone(),
        }
    }
}

#[async_trait]
impl Mailbox for SecMailClient {
    async fn messages(&self) -> Result<Vec<MessageSummary>> {
        let resp = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("action", "getMessages"),
                ("login", self.login.as_str()),
                ("domain", self.domain.as_str()),
            ])
            .send()
            .await
            .context("mailbox getMessages")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("invalid mailbox response code {status}"));
        }
        resp.json().await.context("parsing mailbox message list")
    }

    async fn read(&self, id: u64) -> Result<Message> {
        let id = id.to_string();
        let resp = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("action", "readMessage"),
                ("login", self.login.as_str()),
                ("domain", self.domain.as_str()),
                ("id", id.as_str()),
            ])
            .send()
            .await
            .context("mailbox readMessage")?
            .error_for_status()
            .context("mailbox readMessage status")?;
        resp.json().await.context("parsing mailbox message")
    }
}
